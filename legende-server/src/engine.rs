//! Dedicated inference thread.
//!
//! Both models are loaded once at startup and live on a single
//! `std::thread` for the whole process lifetime. Handlers talk to it over
//! an unbounded channel with oneshot reply channels; the channel also
//! serializes access to the shared model state, so there is no lock.

use anyhow::{anyhow, Result};
use image::DynamicImage;
use legende_core::models::blip::BlipCaptioner;
use legende_core::models::marian::MarianTranslator;
use legende_core::translate::{translate_to_french, Translation};
use legende_core::utils::select_device;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

pub enum EngineRequest {
    /// Caption a decoded image. Captioning errors come back as strings and
    /// are the caller's problem.
    Caption {
        image: DynamicImage,
        tx: oneshot::Sender<Result<String, String>>,
    },
    /// Translate a caption to French. The sentinel policy is applied on the
    /// engine thread, so the reply is always a string-bearing [`Translation`].
    Translate {
        text: String,
        tx: oneshot::Sender<Translation>,
    },
}

pub type EngineHandle = mpsc::UnboundedSender<EngineRequest>;

/// Spawn the engine thread and block until both models are loaded.
///
/// Fails fast: if either model cannot be loaded the error surfaces here and
/// the server never starts listening.
pub fn spawn(force_cpu: bool) -> Result<EngineHandle> {
    let (req_tx, mut req_rx) = mpsc::unbounded_channel::<EngineRequest>();
    let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<()>>();

    std::thread::Builder::new()
        .name("inference-engine".into())
        .spawn(move || {
            let loaded = (|| -> Result<(BlipCaptioner, MarianTranslator)> {
                let device = select_device(force_cpu)?;
                info!("Engine device: {:?}", device);
                let captioner = BlipCaptioner::from_pretrained(&device)?;
                let translator = MarianTranslator::from_pretrained(&device)?;
                Ok((captioner, translator))
            })();

            let (mut captioner, mut translator) = match loaded {
                Ok(models) => {
                    let _ = ready_tx.send(Ok(()));
                    models
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            info!("Engine thread started");

            while let Some(req) = req_rx.blocking_recv() {
                match req {
                    EngineRequest::Caption { image, tx } => {
                        let res = captioner.caption(&image);
                        if let Err(ref e) = res {
                            error!("Captioning failed: {:?}", e);
                        }
                        let _ = tx.send(res.map_err(|e| e.to_string()));
                    }
                    EngineRequest::Translate { text, tx } => {
                        let _ = tx.send(translate_to_french(&mut translator, &text));
                    }
                }
            }
        })?;

    ready_rx
        .recv()
        .map_err(|_| anyhow!("Engine thread died during model load"))??;

    Ok(req_tx)
}
