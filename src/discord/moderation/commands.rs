// Chat filter slash commands for moderators.

use crate::discord::moderation::chat_filter_handler::member_key;
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

type Context<'a> = poise::Context<'a, Data, Error>;

/// Chat filter commands.
///
/// Inspect the filter, reload its configuration, and manage violations.
#[poise::command(
    slash_command,
    subcommands("status", "reload", "violations", "pardon", "forget"),
    required_permissions = "MANAGE_MESSAGES",
    guild_only
)]
pub async fn chatfilter(_ctx: Context<'_>) -> Result<(), Error> {
    // Parent command - shows help
    Ok(())
}

fn threshold_label(count: u32) -> String {
    if count == 0 {
        "off".to_string()
    } else {
        format!("at {} violations", count)
    }
}

/// Show the active filter rules.
#[poise::command(slash_command, guild_only)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let snapshot = ctx.data().snapshot();
    let rules = &snapshot.rules;

    let embed = serenity::CreateEmbed::new()
        .title("🛡️ Chat Filter Status")
        .color(0x00FF00)
        .field(
            "Blocked Terms",
            format!(
                "{} terms\nSpaces ignored: {}\nShow matched term: {}",
                rules.blocked_terms().len(),
                if rules.ignore_spaces_when_matching() { "yes" } else { "no" },
                if rules.show_matched_term() { "yes" } else { "no" },
            ),
            true,
        )
        .field(
            "Caps",
            format!(
                "{:.0}% uppercase\nover more than {} characters",
                rules.uppercase_ratio_threshold() * 100.0,
                rules.minimum_length_for_caps_check()
            ),
            true,
        )
        .field(
            "Rate Limit",
            format!(
                "{} seconds between messages",
                rules.minimum_seconds_between_messages()
            ),
            true,
        )
        .field(
            "Escalation",
            format!(
                "Kick: {}\nBan: {}\nReset after kick: {}",
                threshold_label(rules.kick_at_violation_count()),
                threshold_label(rules.ban_at_violation_count()),
                if rules.reset_violations_after_kick() { "yes" } else { "no" },
            ),
            false,
        )
        .field(
            "Session",
            format!(
                "Language: {}\nTracked members: {}",
                snapshot.catalog.language(),
                ctx.data().engine.tracked_users()
            ),
            false,
        );

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Reload the filter configuration and language bundles from disk.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn reload(ctx: Context<'_>) -> Result<(), Error> {
    match ctx.data().reload() {
        Ok(snapshot) => {
            tracing::info!(
                terms = snapshot.rules.blocked_terms().len(),
                language = snapshot.catalog.language(),
                "Chat filter configuration reloaded"
            );
            ctx.say(format!(
                "✅ Chat filter reloaded ({} blocked terms).",
                snapshot.rules.blocked_terms().len()
            ))
            .await?;
        }
        Err(e) => {
            tracing::warn!("Chat filter reload failed: {}", e);
            ctx.say(format!(
                "❌ Reload failed, keeping the previous configuration: {}",
                e
            ))
            .await?;
        }
    }

    Ok(())
}

/// Show how many violations a member has collected.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn violations(
    ctx: Context<'_>,
    #[description = "Member to check"] user: serenity::User,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let count = ctx
        .data()
        .engine
        .violation_count(&member_key(guild_id, user.id));

    ctx.say(format!("<@{}> has {} violation(s).", user.id, count))
        .await?;
    Ok(())
}

/// Clear a member's violations.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn pardon(
    ctx: Context<'_>,
    #[description = "Member to pardon"] user: serenity::User,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let previous = ctx.data().engine.pardon(&member_key(guild_id, user.id));

    tracing::info!(
        user_id = user.id.get(),
        guild_id = guild_id.get(),
        previous,
        "Chat filter violations pardoned"
    );
    ctx.say(format!(
        "✅ Cleared {} violation(s) for <@{}>.",
        previous, user.id
    ))
    .await?;
    Ok(())
}

/// Drop everything the filter remembers about a member.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn forget(
    ctx: Context<'_>,
    #[description = "Member to forget"] user: serenity::User,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    if ctx.data().engine.forget(&member_key(guild_id, user.id)) {
        tracing::info!(
            user_id = user.id.get(),
            guild_id = guild_id.get(),
            "Chat filter state dropped"
        );
        ctx.say(format!("✅ Forgot everything about <@{}>.", user.id))
            .await?;
    } else {
        ctx.say(format!("<@{}> has no chat filter state.", user.id))
            .await?;
    }
    Ok(())
}
