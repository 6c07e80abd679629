//! 配置校验模块
//!
//! 校验规则：
//! - feed 名称非空且唯一
//! - 各类间隔 > 0
//! - liveness.min_period <= liveness.max_period
//! - liveness.feed 指向已存在的 feed
//! - social feed 必须给出 screen_name
//! - credentials.user 非空

use std::collections::HashSet;
use std::time::Duration;

use contracts::{ContractError, FeedKind, RuntimeBlueprint};

/// 校验 RuntimeBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &RuntimeBlueprint) -> Result<(), ContractError> {
    validate_feed_names(blueprint)?;
    validate_intervals(blueprint)?;
    validate_feed_fields(blueprint)?;
    validate_liveness(blueprint)?;
    Ok(())
}

fn validate_feed_names(blueprint: &RuntimeBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, feed) in blueprint.feeds.iter().enumerate() {
        if feed.name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("feeds[{idx}].name"),
                "feed name cannot be empty",
            ));
        }
        if !seen.insert(feed.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("feeds[name={}]", feed.name),
                "duplicate feed name",
            ));
        }
    }
    Ok(())
}

fn require_positive(field: String, value: Duration) -> Result<(), ContractError> {
    if value.is_zero() {
        return Err(ContractError::config_validation(field, "must be > 0"));
    }
    Ok(())
}

fn validate_intervals(blueprint: &RuntimeBlueprint) -> Result<(), ContractError> {
    require_positive(
        "dispatcher.tick_interval".into(),
        blueprint.dispatcher.tick_interval,
    )?;
    for feed in &blueprint.feeds {
        require_positive(
            format!("feeds[{}].poll_interval", feed.name),
            feed.effective_poll_interval(),
        )?;
        require_positive(
            format!("feeds[{}].backoff", feed.name),
            feed.effective_backoff(),
        )?;
    }
    Ok(())
}

fn validate_feed_fields(blueprint: &RuntimeBlueprint) -> Result<(), ContractError> {
    for feed in &blueprint.feeds {
        if feed.kind == FeedKind::Social
            && feed
                .screen_name
                .as_deref()
                .map_or(true, |name| name.trim().is_empty())
        {
            return Err(ContractError::config_validation(
                format!("feeds[{}].screen_name", feed.name),
                "social feeds require a screen_name",
            ));
        }
        if let Some(credentials) = &feed.credentials {
            if credentials.user.trim().is_empty() {
                return Err(ContractError::config_validation(
                    format!("feeds[{}].credentials.user", feed.name),
                    "user cannot be empty",
                ));
            }
        }
    }
    Ok(())
}

fn validate_liveness(blueprint: &RuntimeBlueprint) -> Result<(), ContractError> {
    let liveness = &blueprint.liveness;

    require_positive("liveness.min_period".into(), liveness.min_period)?;
    if liveness.min_period > liveness.max_period {
        return Err(ContractError::config_validation(
            "liveness.min_period / liveness.max_period",
            format!(
                "min_period ({:?}) must be <= max_period ({:?})",
                liveness.min_period, liveness.max_period
            ),
        ));
    }

    if let Some(target) = &liveness.feed {
        if blueprint.feed(target).is_none() {
            return Err(ContractError::config_validation(
                "liveness.feed",
                format!("feed '{target}' is not configured"),
            ));
        }
    }

    Ok(())
}
