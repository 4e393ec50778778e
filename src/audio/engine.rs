use rodio::{OutputStream, Sink};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;

use super::{ToneBurst, TonePattern, TonePlayer};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

enum AudioCommand {
    Play { pattern: TonePattern, volume: f32 },
    Stop,
}

/// Owns a dedicated thread holding the non-`Send` rodio output objects.
pub struct AudioEngineHandle {
    tx: Arc<Mutex<Option<Sender<AudioCommand>>>>,
    available: Arc<AtomicBool>,
}

impl AudioEngineHandle {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// False while the most recent attempt to open the output device failed.
    /// Every `play` retries the device, so this recovers once it comes back.
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn ensure_thread(&self) -> Result<Sender<AudioCommand>, String> {
        if let Some(tx) = self.tx.lock().map_err(|e| e.to_string())?.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();
        let available = Arc::clone(&self.available);

        thread::Builder::new()
            .name("alarm-audio".to_string())
            .spawn(move || {
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;

                fn open_sink(
                    stream: &mut Option<OutputStream>,
                    sink: &mut Option<Sink>,
                ) -> Result<(), String> {
                    let (s, handle) = OutputStream::try_default()
                        .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
                    let new_sink = Sink::try_new(&handle)
                        .map_err(|e| format!("Failed to create audio sink: {}", e))?;
                    *stream = Some(s);
                    *sink = Some(new_sink);
                    Ok(())
                }

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AudioCommand::Play { pattern, volume } => {
                            // A new alarm replaces whatever is still sounding
                            if let Some(s_old) = sink.take() {
                                s_old.stop();
                            }
                            _stream = None;
                            if let Err(err) = open_sink(&mut _stream, &mut sink) {
                                available.store(false, Ordering::SeqCst);
                                log_warn!("alarm tone skipped: {err}");
                                continue;
                            }
                            available.store(true, Ordering::SeqCst);
                            if let Some(ref s) = sink {
                                s.set_volume(volume.clamp(0.0, 1.0));
                                s.append(ToneBurst::new(pattern));
                                s.play();
                            }
                        }
                        AudioCommand::Stop => {
                            if let Some(s_old) = sink.take() {
                                s_old.stop();
                            }
                            _stream = None;
                        }
                    }
                }
            })
            .map_err(|e| e.to_string())?;

        let tx_clone = tx.clone();
        *self.tx.lock().map_err(|e| e.to_string())? = Some(tx);
        Ok(tx_clone)
    }
}

impl Default for AudioEngineHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl TonePlayer for AudioEngineHandle {
    /// Queues the tone; device errors surface on the audio thread.
    fn play(&self, pattern: TonePattern, volume: f32) -> Result<(), String> {
        let tx = self.ensure_thread()?;
        tx.send(AudioCommand::Play { pattern, volume })
            .map_err(|e| e.to_string())
    }

    fn stop(&self) {
        if let Ok(Some(tx)) = self.tx.lock().map(|g| g.clone()) {
            let _ = tx.send(AudioCommand::Stop);
        }
    }
}
