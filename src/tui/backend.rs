//! Async backend for the TUI
//!
//! The event loop never awaits remote calls itself. It sends a
//! `BackendCommand`, a spawned task does the work, and the outcome comes back
//! as a `BackendResponse` through an mpsc channel.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;

use super::app::ChannelKey;
use crate::auth::AuthSession;
use crate::models::ChatUser;
use crate::notice::Notice;
use crate::services::ClientContext;
use crate::sync::{self, Attachment, MessageChannel, Outgoing, SendError};

pub enum BackendCommand {
    /// Register in the directory if needed and fetch the other users.
    LoadUsers,
    /// Read a file for the compose box of `key`.
    Attach { key: ChannelKey, path: PathBuf },
    Send {
        key: ChannelKey,
        channel: Arc<dyn MessageChannel>,
        outgoing: Outgoing,
    },
    SignOut,
}

pub enum BackendResponse {
    Users(Result<Vec<ChatUser>>),
    Attached {
        key: ChannelKey,
        result: Result<Attachment, SendError>,
    },
    /// The attachment of a send is stored; the record write follows.
    UploadFinished { key: ChannelKey },
    Sent {
        key: ChannelKey,
        result: Result<(), SendError>,
    },
    Notice(Notice),
}

/// Handle for talking to the backend from the event loop.
pub struct Backend {
    cmd_tx: mpsc::UnboundedSender<BackendCommand>,
    resp_rx: mpsc::UnboundedReceiver<BackendResponse>,
}

impl Backend {
    pub fn start(ctx: ClientContext, session: Arc<AuthSession>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (resp_tx, resp_rx) = mpsc::unbounded_channel();

        tokio::spawn(backend_loop(ctx, session, cmd_rx, resp_tx));

        Self { cmd_tx, resp_rx }
    }

    /// Queue a command (non-blocking).
    pub fn send(&self, cmd: BackendCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            tracing::error!("Backend channel closed -- command dropped");
        }
    }

    /// Next response. Meant for use inside `tokio::select!`.
    pub async fn recv(&mut self) -> Option<BackendResponse> {
        self.resp_rx.recv().await
    }
}

async fn backend_loop(
    ctx: ClientContext,
    session: Arc<AuthSession>,
    mut cmd_rx: mpsc::UnboundedReceiver<BackendCommand>,
    resp_tx: mpsc::UnboundedSender<BackendResponse>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        let ctx = ctx.clone();
        let session = Arc::clone(&session);
        let resp_tx = resp_tx.clone();

        // Each command runs on its own task so a slow upload doesn't block
        // directory loads.
        tokio::spawn(async move {
            match cmd {
                BackendCommand::LoadUsers => {
                    let result = sync::bootstrap(ctx.services.documents.as_ref(), &ctx.me).await;
                    let _ = resp_tx.send(BackendResponse::Users(result));
                }
                BackendCommand::Attach { key, path } => {
                    let result = Attachment::from_path(&path).await;
                    let _ = resp_tx.send(BackendResponse::Attached { key, result });
                }
                BackendCommand::Send {
                    key,
                    channel,
                    outgoing,
                } => {
                    let uploaded_tx = resp_tx.clone();
                    let uploaded_key = key.clone();
                    let has_attachment = outgoing.attachment.is_some();
                    let result = sync::deliver(
                        channel.as_ref(),
                        ctx.services.objects.as_ref(),
                        outgoing,
                        move || {
                            if has_attachment {
                                let _ = uploaded_tx
                                    .send(BackendResponse::UploadFinished { key: uploaded_key });
                            }
                        },
                    )
                    .await;

                    // The view may have moved on; the draft of this channel
                    // still has to go.
                    if result.is_ok() {
                        if let Some(drafts) = channel.drafts() {
                            if let Err(e) = drafts.clear() {
                                tracing::warn!("Failed to clear draft: {:#}", e);
                            }
                        }
                    }
                    let _ = resp_tx.send(BackendResponse::Sent { key, result });
                }
                BackendCommand::SignOut => {
                    let notice = session.sign_out().await;
                    let _ = resp_tx.send(BackendResponse::Notice(notice));
                }
            }
        });
    }
}
