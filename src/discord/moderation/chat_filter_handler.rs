// Discord-specific chat filtering - feeds guild messages to the core engine
// and carries out its verdicts with Discord actions.

use crate::core::moderation::{enforce, HostError, ModerationHost};
use crate::discord::{Data, Error};
use async_trait::async_trait;
use chrono::Utc;
use poise::serenity_prelude::{self as serenity, Mentionable};

/// Key the engine uses for a member. Users are tracked per guild.
pub fn member_key(guild_id: serenity::GuildId, user_id: serenity::UserId) -> String {
    format!("{}:{}", guild_id.get(), user_id.get())
}

/// Host actions for one incoming Discord message.
struct DiscordHost<'a> {
    ctx: &'a serenity::Context,
    msg: &'a serenity::Message,
    guild_id: serenity::GuildId,
}

#[async_trait]
impl<'a> ModerationHost for DiscordHost<'a> {
    async fn discard_message(&self) -> Result<(), HostError> {
        self.msg
            .delete(&self.ctx.http)
            .await
            .map_err(|e| HostError::Delivery(e.to_string()))
    }

    async fn send_notice(&self, text: &str) -> Result<(), HostError> {
        // The blocked message is gone, so address the author directly.
        self.msg
            .channel_id
            .say(&self.ctx.http, format!("{} {}", self.msg.author.mention(), text))
            .await
            .map(|_| ())
            .map_err(|e| HostError::Delivery(e.to_string()))
    }

    async fn suspend_user(&self, reason: &str) -> Result<(), HostError> {
        self.guild_id
            .kick_with_reason(&self.ctx.http, self.msg.author.id, reason)
            .await
            .map_err(|e| HostError::Suspension(e.to_string()))
    }

    async fn ban_user(&self, reason: &str) -> Result<(), HostError> {
        self.guild_id
            .ban_with_reason(&self.ctx.http, self.msg.author.id, 0, reason)
            .await
            .map_err(|e| HostError::Suspension(e.to_string()))
    }
}

/// Check a message against the chat filter and enforce the result.
///
/// Returns `true` if the message was blocked (and therefore deleted), so the
/// caller can skip any further processing of it.
pub async fn handle_message_for_filter(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
) -> Result<bool, Error> {
    // Skip bots
    if msg.author.bot {
        return Ok(false);
    }

    // Only filter guild messages
    let guild_id = match msg.guild_id {
        Some(id) => id,
        None => return Ok(false),
    };

    // Attachment, sticker and embed-only posts carry no chat text
    if !has_chat_text(&msg.content) {
        return Ok(false);
    }

    let member_roles: Vec<u64> = msg
        .member
        .as_ref()
        .map(|member| member.roles.iter().map(|role| role.get()).collect())
        .unwrap_or_default();

    let (snapshot, outcome) = data.evaluate(
        &member_key(guild_id, msg.author.id),
        &msg.content,
        &member_roles,
        Utc::now(),
    );

    if !outcome.verdict.is_blocked() {
        return Ok(false);
    }

    let host = DiscordHost { ctx, msg, guild_id };
    if let Err(e) = enforce(&host, &snapshot.catalog, &snapshot.rules, &outcome).await {
        // Already logged step by step; the message still counts as handled.
        tracing::warn!(
            user_id = msg.author.id.get(),
            guild_id = guild_id.get(),
            "Chat filter enforcement incomplete: {}",
            e
        );
    }

    Ok(true)
}

/// Whether a message has any text for the filter to look at.
fn has_chat_text(content: &str) -> bool {
    !content.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_key_is_per_guild() {
        let user = serenity::UserId::new(7);

        assert_eq!(member_key(serenity::GuildId::new(1), user), "1:7");
        assert_ne!(
            member_key(serenity::GuildId::new(1), user),
            member_key(serenity::GuildId::new(2), user)
        );
    }

    #[test]
    fn test_posts_without_text_are_not_filtered() {
        assert!(!has_chat_text(""));
        assert!(!has_chat_text("   \n"));
        assert!(has_chat_text("hi"));
        assert!(has_chat_text(" . "));
    }
}
