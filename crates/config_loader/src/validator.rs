//! 配置校验模块
//!
//! 校验规则：
//! - 字段级规则 (client name 非空)，由 `validator` derive 提供
//! - client name 唯一
//! - 各 kind 的必填参数齐全

use std::collections::HashSet;

use contracts::{HubConfig, TelemetryError};
use ::validator::Validate;

/// 校验 HubConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &HubConfig) -> Result<(), TelemetryError> {
    validate_fields(config)?;
    validate_client_names(config)?;
    validate_client_params(config)?;
    Ok(())
}

/// 字段级校验
fn validate_fields(config: &HubConfig) -> Result<(), TelemetryError> {
    config
        .validate()
        .map_err(|e| TelemetryError::config_validation("clients", e.to_string()))
}

/// 校验 client name 唯一性
fn validate_client_names(config: &HubConfig) -> Result<(), TelemetryError> {
    let mut seen = HashSet::new();
    for client in &config.clients {
        if !seen.insert(&client.name) {
            return Err(TelemetryError::config_validation(
                format!("clients[name={}]", client.name),
                "duplicate client name",
            ));
        }
    }
    Ok(())
}

/// 校验必填参数
fn validate_client_params(config: &HubConfig) -> Result<(), TelemetryError> {
    for client in &config.clients {
        for param in client.kind.required_params() {
            let present = client
                .params
                .get(*param)
                .is_some_and(|value| !value.trim().is_empty());
            if !present {
                return Err(TelemetryError::config_validation(
                    format!("clients[{}].params.{}", client.name, param),
                    format!("'{}' is required for {} clients", param, client.kind),
                ));
            }
        }
    }
    Ok(())
}
