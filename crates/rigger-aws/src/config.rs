//! Shared AWS SDK configuration

use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region, SdkConfig};

/// Region used when neither the caller nor the environment names one
pub const DEFAULT_REGION: &str = "eu-west-1";

/// Load the SDK configuration
///
/// Region priority:
/// 1. `region` argument (CLI `--region`)
/// 2. the SDK default chain (`AWS_REGION`, profile, IMDS)
/// 3. [`DEFAULT_REGION`]
pub async fn load_sdk_config(region: Option<String>) -> SdkConfig {
    let region_provider = RegionProviderChain::first_try(region.map(Region::new))
        .or_default_provider()
        .or_else(Region::new(DEFAULT_REGION));

    let config = aws_config::defaults(BehaviorVersion::latest())
        .region(region_provider)
        .load()
        .await;

    tracing::debug!(
        "AWS region: {}",
        config.region().map(|r| r.as_ref()).unwrap_or("<unset>")
    );

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_explicit_region_wins() {
        let config = load_sdk_config(Some("ap-northeast-1".to_string())).await;
        assert_eq!(config.region().map(|r| r.as_ref()), Some("ap-northeast-1"));
    }
}
