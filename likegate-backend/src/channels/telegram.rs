//! Telegram front-end: `/like`, `/givevip`, `/help`, plus the notifier and
//! membership oracle backed by the Bot API.

use async_trait::async_trait;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{
    ChatMemberKind, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, Recipient, UserId,
};
use teloxide::utils::command::BotCommands;
use tokio::sync::oneshot;

use super::Notifier;
use crate::error::{AdminError, CreateRequestError};
use crate::like_service::LikeService;
use crate::membership::{MemberStatus, MembershipOracle};
use crate::messages;

const DEFAULT_REGION: &str = "ind";

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    #[command(description = "request a like: /like <region> <uid>")]
    Like(String),
    #[command(description = "operators only: /givevip <user_id>")]
    Givevip(String),
    #[command(description = "show help")]
    Help,
    #[command(description = "show help")]
    Start,
}

/// Shared state handed to every update handler.
pub struct TelegramContext {
    pub service: Arc<LikeService>,
    pub required_group: Option<String>,
    pub how_to_verify_url: Option<String>,
    pub vip_access_url: Option<String>,
}

pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, conversation_id: i64, anchor_message_id: i64, text: &str) -> Result<(), String> {
        let mut req = self
            .bot
            .send_message(ChatId(conversation_id), text)
            .allow_sending_without_reply(true);
        if let Ok(id) = i32::try_from(anchor_message_id) {
            req = req.reply_to_message_id(MessageId(id));
        }
        req.await
            .map(|_| ())
            .map_err(|e| format!("Telegram send_message failed: {}", e))
    }
}

/// Looks up the requester in `REQUIRED_CHANNEL` (`@name` or a numeric chat id).
pub struct TelegramMembershipOracle {
    bot: Bot,
    group: Recipient,
}

impl TelegramMembershipOracle {
    pub fn new(bot: Bot, group: &str) -> Self {
        Self {
            bot,
            group: parse_recipient(group),
        }
    }
}

#[async_trait]
impl MembershipOracle for TelegramMembershipOracle {
    async fn member_status(&self, user_id: i64) -> Result<MemberStatus, String> {
        let uid = u64::try_from(user_id).map_err(|_| format!("invalid user id {}", user_id))?;
        let member = self
            .bot
            .get_chat_member(self.group.clone(), UserId(uid))
            .await
            .map_err(|e| format!("get_chat_member failed: {}", e))?;

        Ok(match member.kind {
            ChatMemberKind::Owner(_) => MemberStatus::Owner,
            ChatMemberKind::Administrator(_) => MemberStatus::Administrator,
            ChatMemberKind::Member => MemberStatus::Member,
            ChatMemberKind::Restricted(_) => MemberStatus::Restricted,
            ChatMemberKind::Left => MemberStatus::Left,
            ChatMemberKind::Banned(_) => MemberStatus::Banned,
        })
    }
}

fn parse_recipient(group: &str) -> Recipient {
    let group = group.trim();
    match group.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) if group.starts_with('@') => Recipient::ChannelUsername(group.to_string()),
        Err(_) => Recipient::ChannelUsername(format!("@{}", group)),
    }
}

/// `/like` arguments: `<region> <uid>` or just `<uid>`.
pub fn parse_like_args(args: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = args.split_whitespace().collect();
    match parts.as_slice() {
        [uid] => Some((DEFAULT_REGION.to_string(), uid.to_string())),
        [region, uid] => Some((region.to_lowercase(), uid.to_string())),
        _ => None,
    }
}

pub fn parse_user_id(args: &str) -> Option<i64> {
    let parts: Vec<&str> = args.split_whitespace().collect();
    match parts.as_slice() {
        [id] => id.parse().ok(),
        _ => None,
    }
}

fn create_error_reply(err: &CreateRequestError, required_group: Option<&str>) -> String {
    match err {
        CreateRequestError::NotEligible => {
            messages::join_required(required_group.unwrap_or("the required channel"))
        }
        CreateRequestError::InvalidTarget(reason) => messages::invalid_target(reason),
        CreateRequestError::Storage(_) => messages::TRY_AGAIN_LATER.to_string(),
    }
}

fn url_button(label: &str, link: &str) -> Option<InlineKeyboardButton> {
    match url::Url::parse(link) {
        Ok(u) => Some(InlineKeyboardButton::url(label.to_string(), u)),
        Err(e) => {
            log::warn!("Telegram: skipping button '{}', bad url {}: {}", label, link, e);
            None
        }
    }
}

fn request_keyboard(
    verification_link: &str,
    how_to_verify_url: Option<&str>,
    vip_access_url: Option<&str>,
) -> InlineKeyboardMarkup {
    let rows = [
        url_button("✅ VERIFY & SEND LIKE ✅", verification_link),
        how_to_verify_url.and_then(|u| url_button("❓ How to Verify ❓", u)),
        vip_access_url.and_then(|u| url_button("🧠 PURCHASE VIP & NO VERIFY", u)),
    ]
    .into_iter()
    .flatten()
    .map(|b| vec![b])
    .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(rows)
}

async fn handle_like(bot: &Bot, msg: &Message, ctx: &TelegramContext, args: &str) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let requester_id = user.id.0 as i64;

    // Membership comes first so non-members never learn the argument format
    let Some((region, uid)) = parse_like_args(args) else {
        let text = if ctx.service.is_eligible(requester_id).await {
            messages::USAGE.to_string()
        } else {
            create_error_reply(&CreateRequestError::NotEligible, ctx.required_group.as_deref())
        };
        bot.send_message(msg.chat.id, text).reply_to_message_id(msg.id).await?;
        return Ok(());
    };

    let created = match ctx
        .service
        .create_request(requester_id, msg.chat.id.0, msg.id.0 as i64, &uid)
        .await
    {
        Ok(c) => c,
        Err(e) => {
            log::info!("Telegram: /like from {} rejected: {}", requester_id, e);
            let text = create_error_reply(&e, ctx.required_group.as_deref());
            bot.send_message(msg.chat.id, text).reply_to_message_id(msg.id).await?;
            return Ok(());
        }
    };

    let mut text = messages::request_created(
        &created.display_name,
        &created.request.target_account_id,
        &region,
        ctx.service.request_ttl().num_minutes(),
    );
    let keyboard = request_keyboard(
        &created.verification_link,
        ctx.how_to_verify_url.as_deref(),
        ctx.vip_access_url.as_deref(),
    );
    if url::Url::parse(&created.verification_link).is_err() {
        text.push_str(&format!("\n\n🔗 {}", created.verification_link));
    }

    bot.send_message(msg.chat.id, text)
        .reply_to_message_id(msg.id)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

async fn handle_givevip(bot: &Bot, msg: &Message, ctx: &TelegramContext, args: &str) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let operator_id = user.id.0 as i64;

    let reply = if !ctx.service.is_operator(operator_id) {
        messages::NOT_AUTHORIZED.to_string()
    } else {
        match parse_user_id(args) {
            None => messages::GIVEVIP_USAGE.to_string(),
            Some(target) => match ctx.service.grant_vip(operator_id, target) {
                Ok(()) => messages::vip_granted(target),
                Err(AdminError::NotAuthorized(_)) => messages::NOT_AUTHORIZED.to_string(),
                Err(AdminError::Storage(e)) => {
                    log::error!("Telegram: failed to grant VIP to {}: {}", target, e);
                    messages::TRY_AGAIN_LATER.to_string()
                }
            },
        }
    };

    bot.send_message(msg.chat.id, reply).reply_to_message_id(msg.id).await?;
    Ok(())
}

async fn handle_command(bot: Bot, msg: Message, cmd: Command, ctx: Arc<TelegramContext>) -> ResponseResult<()> {
    match cmd {
        Command::Like(args) => handle_like(&bot, &msg, &ctx, &args).await,
        Command::Givevip(args) => handle_givevip(&bot, &msg, &ctx, &args).await,
        Command::Help | Command::Start => {
            bot.send_message(msg.chat.id, messages::help()).await?;
            Ok(())
        }
    }
}

/// Run the long-polling dispatcher until `shutdown_rx` fires.
pub async fn start_telegram_listener(
    bot: Bot,
    ctx: Arc<TelegramContext>,
    shutdown_rx: oneshot::Receiver<()>,
) -> Result<(), String> {
    log::info!("Telegram: Validating bot token...");
    let me = bot
        .get_me()
        .await
        .map_err(|e| format!("Invalid Telegram bot token: {}", e))?;
    let bot_username = me.username().to_string();
    log::info!("Telegram: Bot validated - username: @{}, id: {}", bot_username, me.id);

    let handler = Update::filter_message().endpoint(
        move |bot: Bot, msg: Message, ctx: Arc<TelegramContext>| {
            let bot_username = bot_username.clone();
            async move {
                let Some(text) = msg.text() else {
                    return Ok(());
                };
                match Command::parse(text, &bot_username) {
                    Ok(cmd) => {
                        log::info!("Telegram: {:?} from chat {}", cmd, msg.chat.id);
                        handle_command(bot, msg, cmd, ctx).await
                    }
                    Err(_) => Ok(()),
                }
            }
        },
    );

    let mut tg_dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![ctx])
        .build();

    tokio::select! {
        _ = shutdown_rx => {
            log::info!("Telegram listener received shutdown signal");
        }
        _ = tg_dispatcher.dispatch() => {
            log::info!("Telegram listener stopped");
        }
    }

    Ok(())
}
