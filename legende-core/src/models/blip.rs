//! BLIP image-captioning wrapper.
//!
//! Wraps `candle_transformers`' BLIP implementation with greedy decoding:
//! image in, English caption out.

use anyhow::{Error as E, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::blip::{self, VisionConfig};
use candle_transformers::models::blip_text;
use hf_hub::{api::sync::Api, Repo, RepoType};
use image::DynamicImage;
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::utils::image_utils;

/// Hub repository the captioning weights are pulled from.
pub const MODEL_ID: &str = "Salesforce/blip-image-captioning-base";

const BOS_TOKEN_ID: u32 = 30522;
const SEP_TOKEN_ID: u32 = 102;
const MAX_CAPTION_TOKENS: usize = 1000;
const SAMPLING_SEED: u64 = 1337;

pub struct BlipCaptioner {
    model: blip::BlipForConditionalGeneration,
    tokenizer: Tokenizer,
    logits_processor: LogitsProcessor,
    device: Device,
}

/// Config matching `Salesforce/blip-image-captioning-base`.
fn base_config() -> blip::Config {
    let text_config = blip_text::Config {
        vocab_size: 30524,
        hidden_size: 768,
        encoder_hidden_size: 768,
        intermediate_size: 3072,
        projection_dim: 768,
        num_hidden_layers: 12,
        num_attention_heads: 12,
        max_position_embeddings: 512,
        hidden_act: candle_nn::Activation::Gelu,
        layer_norm_eps: 1e-12,
        is_decoder: true,
    };
    let vision_config = VisionConfig {
        hidden_size: 768,
        intermediate_size: 3072,
        projection_dim: 512,
        num_hidden_layers: 12,
        num_attention_heads: 12,
        image_size: 384,
        patch_size: 16,
        hidden_act: candle_nn::Activation::Gelu,
        layer_norm_eps: 1e-5,
    };

    blip::Config {
        text_config,
        vision_config,
        projection_dim: 512,
        image_text_hidden_size: 256,
    }
}

impl BlipCaptioner {
    /// Download weights and tokenizer from the Hugging Face hub and load them.
    pub fn from_pretrained(device: &Device) -> Result<Self> {
        info!("Loading BLIP captioner from HF: {}", MODEL_ID);

        let api = Api::new()?;
        let repo = api.repo(Repo::new(MODEL_ID.to_string(), RepoType::Model));

        let tokenizer_path = repo.get("tokenizer.json")?;
        let model_file = repo
            .get("model.safetensors")
            .or_else(|_| repo.get("pytorch_model.bin"))?;

        Self::load(&model_file, &tokenizer_path, device)
    }

    /// Load from a local directory holding `tokenizer.json` and the weights.
    pub fn from_local(dir: impl AsRef<Path>, device: &Device) -> Result<Self> {
        let base = dir.as_ref();
        if !base.is_dir() {
            return Err(E::msg(format!("Not a directory: {:?}", base)));
        }

        let safetensors_path = base.join("model.safetensors");
        let model_file = if safetensors_path.exists() {
            safetensors_path
        } else {
            let pth_path = base.join("pytorch_model.bin");
            if !pth_path.exists() {
                return Err(E::msg(
                    "Neither model.safetensors nor pytorch_model.bin found",
                ));
            }
            pth_path
        };

        Self::load(&model_file, &base.join("tokenizer.json"), device)
    }

    fn load(model_file: &Path, tokenizer_path: &Path, device: &Device) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| E::msg(format!("Failed to load tokenizer: {}", e)))?;

        let vb = if model_file.extension().map_or(false, |ext| ext == "bin") {
            VarBuilder::from_pth(model_file, DType::F32, device)?
        } else {
            unsafe { VarBuilder::from_mmaped_safetensors(&[model_file], DType::F32, device)? }
        };
        let model = blip::BlipForConditionalGeneration::new(&base_config(), vb)?;

        Ok(Self {
            model,
            tokenizer,
            logits_processor: LogitsProcessor::new(SAMPLING_SEED, None, None),
            device: device.clone(),
        })
    }

    /// Generate an English caption for an image.
    ///
    /// Greedy decode from BOS until the SEP token, bounded by
    /// [`MAX_CAPTION_TOKENS`]. The decoder KV cache is reset on entry so the
    /// captioner can be reused across requests.
    pub fn caption(&mut self, img: &DynamicImage) -> Result<String> {
        let pixels = image_utils::to_blip_tensor(img, &self.device)?;
        let image_embeds = pixels.unsqueeze(0)?.apply(self.model.vision_model())?;

        self.model.reset_kv_cache();

        let mut token_ids = vec![BOS_TOKEN_ID];
        for index in 0..MAX_CAPTION_TOKENS {
            let context_size = if index > 0 { 1 } else { token_ids.len() };
            let start_pos = token_ids.len().saturating_sub(context_size);
            let input_ids = Tensor::new(&token_ids[start_pos..], &self.device)?.unsqueeze(0)?;
            let logits = self.model.text_decoder().forward(&input_ids, &image_embeds)?;
            let logits = logits.squeeze(0)?;
            let logits = logits.get(logits.dim(0)? - 1)?;
            let token = self.logits_processor.sample(&logits)?;
            if token == SEP_TOKEN_ID {
                break;
            }
            token_ids.push(token);
        }

        let caption = self
            .tokenizer
            .decode(&token_ids[1..], true)
            .map_err(|e| E::msg(format!("Tokenizer decode failed: {}", e)))?;
        let caption = caption.trim().to_string();
        debug!("generated caption: {}", caption);
        Ok(caption)
    }
}
