//! One-shot CLI commands
//!
//! Each command connects, does its work through the same synchronizers the
//! TUI uses, prints to stdout and exits.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures::StreamExt;

use crate::models::{ChannelId, ChatMessage, ChatUser, Topic, EMPTY_FEED_PROMPT};
use crate::services::ClientContext;
use crate::sync::{
    self, Attachment, Composer, DirectChannel, DraftCache, ForumChannel, MessageChannel,
};

/// Directory entry for `uid`, or a bare placeholder when it isn't registered.
async fn recipient(ctx: &ClientContext, uid: &str) -> Result<ChatUser> {
    if uid == ctx.me.uid {
        bail!("Cannot open a direct chat with yourself");
    }
    match ctx.services.documents.find_user(uid).await? {
        Some(user) => Ok(user),
        None => {
            tracing::warn!("{} is not in the user directory", uid);
            Ok(ChatUser {
                uid: uid.to_string(),
                display_name: uid.to_string(),
                photo_url: String::new(),
                email: String::new(),
            })
        }
    }
}

async fn direct_channel(ctx: &ClientContext, uid: &str) -> Result<DirectChannel> {
    Ok(DirectChannel::new(
        ctx.services.clone(),
        ctx.me.clone(),
        recipient(ctx, uid).await?,
        ctx.poll_interval,
    ))
}

fn forum_channel(ctx: &ClientContext, topic_id: &str) -> Result<ForumChannel> {
    let topic = Topic::find(topic_id).with_context(|| {
        format!("Unknown topic '{}'. Run 'chatapp topics' to list them.", topic_id)
    })?;
    ForumChannel::open(Arc::clone(&ctx.services.local), ctx.me.clone(), topic)
}

fn print_message(msg: &ChatMessage) {
    let time = msg.time_label();
    let time = if time.is_empty() { "--:--".to_string() } else { time };
    if !msg.text.is_empty() {
        println!("[{}] {}: {}", time, msg.author_name, msg.text);
    } else {
        println!("[{}] {}:", time, msg.author_name);
    }
    if let Some(ref media) = msg.media {
        println!("        {}", media.marker());
    }
}

fn print_messages(messages: &[ChatMessage], limit: usize) {
    if messages.is_empty() {
        println!("{}", EMPTY_FEED_PROMPT);
        return;
    }
    let skip = messages.len().saturating_sub(limit);
    for msg in &messages[skip..] {
        print_message(msg);
    }
}

/// Compose and send one message through `channel`.
async fn post(
    ctx: &ClientContext,
    channel: &dyn MessageChannel,
    message: Option<String>,
    attach: Option<PathBuf>,
) -> Result<()> {
    let mut composer = Composer::default();
    composer.set_text(message.unwrap_or_default());
    if let Some(path) = attach {
        match Attachment::from_path(&path).await {
            Ok(attachment) => composer.attach(attachment),
            Err(e) => bail!("{}", e.notice()),
        }
    }

    if let Err(e) = composer
        .submit(channel, ctx.services.objects.as_ref())
        .await
    {
        tracing::debug!("Send failed: {}", e);
        bail!("{}", e.notice());
    }
    println!("Message sent to {}.", channel.title());
    Ok(())
}

/// Show the signed-in identity.
pub async fn whoami() -> Result<()> {
    let ctx = ClientContext::connect().await?;
    let me = &ctx.me;

    println!("\nSigned in as:");
    println!("{:-<40}", "");
    println!("Name:  {}", me.display_name());
    println!("Email: {}", me.email.as_deref().unwrap_or("-"));
    println!("UID:   {}", me.uid);
    if let Some(ref photo) = me.photo_url {
        println!("Photo: {}", photo);
    }
    Ok(())
}

/// Register in the directory if needed and list the other users.
pub async fn users(search: Option<String>) -> Result<()> {
    let ctx = ClientContext::connect().await?;
    let users = sync::bootstrap(ctx.services.documents.as_ref(), &ctx.me).await?;
    let hits = sync::filter_users(&users, search.as_deref().unwrap_or_default());

    println!("\nUsers:");
    println!("{:-<60}", "");
    if hits.is_empty() {
        println!("  (no users found)");
        return Ok(());
    }
    for user in hits {
        println!("{}", user.display_name);
        if !user.email.is_empty() {
            println!("  Email: {}", user.email);
        }
        println!("  UID:   {}", user.uid);
        println!();
    }
    Ok(())
}

/// Print the latest messages of the direct chat with `uid`.
pub async fn read(uid: &str, limit: usize) -> Result<()> {
    let ctx = ClientContext::connect().await?;
    let chat = direct_channel(&ctx, uid).await?;
    let messages = chat.list().await?;
    print_messages(&messages, limit);
    Ok(())
}

/// Send a direct message, optionally with an attachment.
pub async fn send(to: &str, message: Option<String>, attach: Option<PathBuf>) -> Result<()> {
    let ctx = ClientContext::connect().await?;
    let chat = direct_channel(&ctx, to).await?;
    post(&ctx, &chat, message, attach).await
}

/// Follow a direct chat, printing new messages until Ctrl-C.
pub async fn watch(uid: &str) -> Result<()> {
    let ctx = ClientContext::connect().await?;
    let chat = direct_channel(&ctx, uid).await?;
    println!("Watching chat with {} (Ctrl-C to stop)", chat.title());

    let mut updates = chat.subscribe().into_stream();
    let mut seen: HashSet<String> = HashSet::new();
    loop {
        tokio::select! {
            snapshot = updates.next() => {
                let Some(snapshot) = snapshot else { break };
                if snapshot.is_empty() && seen.is_empty() {
                    println!("{}", EMPTY_FEED_PROMPT);
                }
                for msg in snapshot.iter().filter(|m| !seen.contains(&m.id)) {
                    print_message(msg);
                }
                seen.extend(snapshot.into_iter().map(|m| m.id));
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

/// Print the persisted draft for the direct chat with `uid`.
pub async fn draft(uid: &str) -> Result<()> {
    let ctx = ClientContext::connect().await?;
    let channel = ChannelId::between(&ctx.me.uid, uid);
    let drafts = DraftCache::new(Arc::clone(&ctx.services.local), &channel);
    match drafts.restore()? {
        Some(text) => println!("{}", text),
        None => println!("(no draft for {})", channel),
    }
    Ok(())
}

/// List the forum topics.
pub fn topics() {
    println!("\nTopics:");
    println!("{:-<60}", "");
    for topic in Topic::all() {
        println!("{} {} ({})", topic.icon, topic.name, topic.id);
        println!("  {}", topic.description);
    }
}

pub async fn forum_read(topic_id: &str, limit: usize) -> Result<()> {
    let ctx = ClientContext::connect().await?;
    let forum = forum_channel(&ctx, topic_id)?;
    println!("{}", forum.title());
    print_messages(&forum.list().await?, limit);
    Ok(())
}

pub async fn forum_post(
    topic_id: &str,
    message: Option<String>,
    attach: Option<PathBuf>,
) -> Result<()> {
    let ctx = ClientContext::connect().await?;
    let forum = forum_channel(&ctx, topic_id)?;
    post(&ctx, &forum, message, attach).await
}
