mod request_logger;

use std::io::{self, Write};
use std::str::FromStr;

use env_logger::Builder;
use log::LevelFilter;
use tokio::{
    fs::{create_dir_all, metadata, OpenOptions},
    io::{AsyncWriteExt, BufWriter},
    sync::{
        mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
        watch,
    },
};

use crate::{
    config,
    core::{SoapError, SoapResult},
};

pub use request_logger::{LogRequestLogger, Redactor, REDACTED};

pub struct AsyncWriter {
    sender: UnboundedSender<Vec<u8>>,
}

impl Write for AsyncWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let data = buf.to_vec();
        self.sender.send(data).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Process logger: env_logger in front, optionally an async file sink behind.
pub struct Logger {
    sender: UnboundedSender<Vec<u8>>,
    receiver: UnboundedReceiver<Vec<u8>>,
    config: config::Log,
}

impl Logger {
    pub fn new(config: config::Log) -> Self {
        let (sender, receiver) = unbounded_channel::<Vec<u8>>();
        Self {
            sender,
            receiver,
            config,
        }
    }

    fn create_async_writer(&self) -> AsyncWriter {
        AsyncWriter {
            sender: self.sender.clone(),
        }
    }

    fn builder(&self) -> Builder {
        // level strings are checked when the config is validated
        let level = LevelFilter::from_str(&self.config.level).unwrap_or(LevelFilter::Info);

        let mut builder = Builder::from_env(env_logger::Env::default());
        builder.filter(None, level);
        if self.config.path.is_some() {
            builder.target(env_logger::Target::Pipe(Box::new(self.create_async_writer())));
        }
        builder
    }

    /// Install env_logger as the global logger.
    ///
    /// Records go to stderr, or to the channel drained by [`Logger::run`]
    /// when a log path is configured.
    pub fn init_env_logger(&self) -> SoapResult<()> {
        self.builder()
            .try_init()
            .map_err(|e| SoapError::Configuration(format!("Failed to install logger: {e}")))
    }

    /// Write piped records to the log file until `shutdown` flips to true.
    ///
    /// Returns immediately when no log path is configured.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> SoapResult<()> {
        let Some(log_file_path) = self.config.path.clone() else {
            return Ok(());
        };

        if let Some(parent) = std::path::Path::new(&log_file_path).parent() {
            if !parent.as_os_str().is_empty() && metadata(parent).await.is_err() {
                create_dir_all(parent).await?;
            }
        }

        let mut file = BufWriter::new(
            OpenOptions::new()
                .append(true)
                .create(true)
                .open(&log_file_path)
                .await?,
        );

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        log::info!("Shutdown signal received, stopping write log");
                        break;
                    }
                },

                data = self.receiver.recv() => {
                    match data {
                        Some(data) => {
                            if let Err(e) = file.write_all(&data).await {
                                log::error!("Failed to write to log file: {}", e);
                            }
                        }
                        None => {
                            log::info!("Log channel closed, stopping write log");
                            break;
                        }
                    }
                }
            }
        }

        // records queued before the shutdown signal still belong in the file
        while let Ok(data) = self.receiver.try_recv() {
            file.write_all(&data).await?;
        }

        file.flush().await?;
        Ok(())
    }
}
