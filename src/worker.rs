use crate::chat_api::{ChatClient, ChatConfig, ChatError, ChatReply};
use std::future::Future;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use tracing::{debug, warn};

pub type RequestId = u64;

/// Seam between the widget and the network. Calls must not block.
pub trait Dispatch {
    fn chat(&mut self, id: RequestId, query: String);
    fn track_view(&mut self);
}

#[derive(Debug)]
pub enum WorkerEvent {
    Reply {
        id: RequestId,
        outcome: Result<ChatReply, ChatError>,
    },
}

/// Runs every request on its own thread with a private tokio runtime and
/// reports completions over a channel drained by the UI loop.
pub struct ThreadDispatcher {
    config: ChatConfig,
    tx: Sender<WorkerEvent>,
}

impl ThreadDispatcher {
    pub fn new(config: ChatConfig, tx: Sender<WorkerEvent>) -> Self {
        Self { config, tx }
    }

    pub fn channel(config: ChatConfig) -> (Self, Receiver<WorkerEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self::new(config, tx), rx)
    }
}

impl Dispatch for ThreadDispatcher {
    fn chat(&mut self, id: RequestId, query: String) {
        let config = self.config.clone();
        let tx = self.tx.clone();

        thread::spawn(move || {
            let outcome = block_on(async move {
                let client = ChatClient::new(config)?;
                client.chat(&query).await
            });

            if tx.send(WorkerEvent::Reply { id, outcome }).is_err() {
                debug!(id, "widget gone before reply arrived");
            }
        });
    }

    fn track_view(&mut self) {
        let config = self.config.clone();

        thread::spawn(move || {
            let result = block_on(async move {
                let client = ChatClient::new(config)?;
                client.track_view().await
            });

            match result {
                Ok(()) => debug!("view tracked"),
                Err(err) => warn!(error = %err, "could not track view"),
            }
        });
    }
}

fn block_on<T, F>(future: F) -> Result<T, ChatError>
where
    F: Future<Output = Result<T, ChatError>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| ChatError::Transport(format!("cannot start async runtime: {err}")))?;

    runtime.block_on(future)
}
