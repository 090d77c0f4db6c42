//! MarianMT English→French translation wrapper.
//!
//! Wraps `candle_transformers`' Marian implementation (the
//! `Helsinki-NLP/opus-mt-en-fr` checkpoint) with greedy decoding.

use anyhow::{Error as E, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::marian;
use hf_hub::{api::sync::Api, Repo, RepoType};
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::translate::Translator;

/// Hub repository the translation weights are pulled from.
pub const MODEL_ID: &str = "Helsinki-NLP/opus-mt-en-fr";
/// Hub repository carrying tokenizers.json conversions of the Marian
/// sentencepiece vocabularies.
pub const TOKENIZER_REPO: &str = "lmz/candle-marian";

const SRC_TOKENIZER_FILE: &str = "tokenizer-marian-base-en.json";
const TGT_TOKENIZER_FILE: &str = "tokenizer-marian-base-fr.json";
const SAMPLING_SEED: u64 = 1337;

/// Config matching `Helsinki-NLP/opus-mt-en-fr`.
///
/// candle-transformers only ships presets for the fr→en direction; the
/// values here come from the checkpoint's `config.json`
/// (https://huggingface.co/Helsinki-NLP/opus-mt-en-fr/blob/main/config.json).
fn en_fr_config() -> marian::Config {
    marian::Config {
        activation_function: candle_nn::Activation::Swish,
        d_model: 512,
        decoder_attention_heads: 8,
        decoder_ffn_dim: 2048,
        decoder_layers: 6,
        decoder_start_token_id: 59513,
        decoder_vocab_size: Some(59514),
        encoder_attention_heads: 8,
        encoder_ffn_dim: 2048,
        encoder_layers: 6,
        eos_token_id: 0,
        forced_eos_token_id: 0,
        is_encoder_decoder: true,
        max_position_embeddings: 512,
        pad_token_id: 59513,
        scale_embedding: true,
        share_encoder_decoder_embeddings: true,
        use_cache: true,
        vocab_size: 59514,
    }
}

/// Reject tokenizers that cannot belong to the checkpoint's vocabulary:
/// Marian vocabularies put `</s>` at id 0, and no token id may exceed the
/// embedding table. Catches a mismatched tokenizer file at load time
/// instead of producing garbage translations.
fn validate_tokenizer(tokenizer: &Tokenizer, side: &str, vocab_size: usize) -> Result<()> {
    match tokenizer.token_to_id("</s>") {
        Some(0) => {}
        other => {
            return Err(E::msg(format!(
                "{} tokenizer maps </s> to {:?}, expected id 0 for {}",
                side, other, MODEL_ID
            )))
        }
    }
    let n = tokenizer.get_vocab_size(true);
    if n > vocab_size {
        return Err(E::msg(format!(
            "{} tokenizer has {} tokens but {} expects at most {}",
            side, n, MODEL_ID, vocab_size
        )));
    }
    Ok(())
}

pub struct MarianTranslator {
    model: marian::MTModel,
    src_tokenizer: Tokenizer,
    tgt_tokenizer: Tokenizer,
    config: marian::Config,
    logits_processor: LogitsProcessor,
    device: Device,
}

impl MarianTranslator {
    /// Download weights and tokenizers from the Hugging Face hub and load them.
    pub fn from_pretrained(device: &Device) -> Result<Self> {
        info!("Loading Marian translator from HF: {}", MODEL_ID);

        let api = Api::new()?;
        let repo = api.repo(Repo::new(MODEL_ID.to_string(), RepoType::Model));
        let model_file = repo
            .get("model.safetensors")
            .or_else(|_| repo.get("pytorch_model.bin"))?;

        let tokenizer_repo = api.model(TOKENIZER_REPO.to_string());
        let src_tokenizer_path = tokenizer_repo.get(SRC_TOKENIZER_FILE)?;
        let tgt_tokenizer_path = tokenizer_repo.get(TGT_TOKENIZER_FILE)?;

        Self::load(&model_file, &src_tokenizer_path, &tgt_tokenizer_path, device)
    }

    /// Load from local files (weights plus source/target tokenizers).
    pub fn from_local(
        model_file: impl AsRef<Path>,
        src_tokenizer: impl AsRef<Path>,
        tgt_tokenizer: impl AsRef<Path>,
        device: &Device,
    ) -> Result<Self> {
        Self::load(
            model_file.as_ref(),
            src_tokenizer.as_ref(),
            tgt_tokenizer.as_ref(),
            device,
        )
    }

    fn load(
        model_file: &Path,
        src_tokenizer_path: &Path,
        tgt_tokenizer_path: &Path,
        device: &Device,
    ) -> Result<Self> {
        let src_tokenizer = Tokenizer::from_file(src_tokenizer_path)
            .map_err(|e| E::msg(format!("Failed to load source tokenizer: {}", e)))?;
        let tgt_tokenizer = Tokenizer::from_file(tgt_tokenizer_path)
            .map_err(|e| E::msg(format!("Failed to load target tokenizer: {}", e)))?;

        let config = en_fr_config();
        validate_tokenizer(&src_tokenizer, "source", config.vocab_size)?;
        validate_tokenizer(
            &tgt_tokenizer,
            "target",
            config.decoder_vocab_size.unwrap_or(config.vocab_size),
        )?;

        let vb = if model_file.extension().map_or(false, |ext| ext == "bin") {
            VarBuilder::from_pth(model_file, DType::F32, device)?
        } else {
            unsafe { VarBuilder::from_mmaped_safetensors(&[model_file], DType::F32, device)? }
        };
        let model = marian::MTModel::new(&config, vb)?;

        Ok(Self {
            model,
            src_tokenizer,
            tgt_tokenizer,
            config,
            logits_processor: LogitsProcessor::new(SAMPLING_SEED, None, None),
            device: device.clone(),
        })
    }

    /// Translate a single English sentence to French.
    ///
    /// Runs the encoder once, then greedy-decodes from the decoder start
    /// token until EOS, bounded by the model's position limit. The KV cache
    /// is reset on entry so the translator can be reused across calls.
    pub fn translate(&mut self, text: &str) -> Result<String> {
        self.model.reset_kv_cache();

        let encoder_xs = {
            let mut tokens = self
                .src_tokenizer
                .encode(text, true)
                .map_err(E::msg)?
                .get_ids()
                .to_vec();
            tokens.push(self.config.eos_token_id);
            let tokens = Tensor::new(tokens.as_slice(), &self.device)?.unsqueeze(0)?;
            self.model.encoder().forward(&tokens, 0)?
        };

        let mut token_ids = vec![self.config.decoder_start_token_id];
        for index in 0..self.config.max_position_embeddings {
            let context_size = if index >= 1 { 1 } else { token_ids.len() };
            let start_pos = token_ids.len().saturating_sub(context_size);
            let input_ids = Tensor::new(&token_ids[start_pos..], &self.device)?.unsqueeze(0)?;
            let logits = self.model.decode(&input_ids, &encoder_xs, start_pos)?;
            let logits = logits.squeeze(0)?;
            let logits = logits.get(logits.dim(0)? - 1)?;
            let token = self.logits_processor.sample(&logits)?;
            if token == self.config.eos_token_id || token == self.config.forced_eos_token_id {
                break;
            }
            token_ids.push(token);
        }

        let translation = self
            .tgt_tokenizer
            .decode(&token_ids[1..], true)
            .map_err(|e| E::msg(format!("Tokenizer decode failed: {}", e)))?;
        let translation = translation.trim().to_string();
        debug!("translated {:?} -> {:?}", text, translation);
        Ok(translation)
    }
}

impl Translator for MarianTranslator {
    /// One output per input, in input order. Empty and single-item batches
    /// are fine; the model itself sees one sentence at a time.
    fn translate_batch(&mut self, texts: &[String]) -> Result<Vec<String>> {
        texts.iter().map(|text| self.translate(text)).collect()
    }
}
