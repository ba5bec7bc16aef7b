//! Prebuilt GAQL report queries
//!
//! Every template goes through `GaqlBuilder`, so the output is always a
//! query that passes `validate`.

use super::builder::GaqlBuilder;
use crate::common::{AppResult, XwanderError};

/// Names accepted by [`QueryTemplates::by_name`]
pub const TEMPLATE_NAMES: &[&str] = &[
    "campaign_performance",
    "conversion_actions",
    "conversion_performance",
    "search_terms",
    "ad_group_performance",
    "keyword_performance",
    "asset_group_performance",
    "pmax_insights",
    "geographic_performance",
    "audience_performance",
];

/// Parameters shared by the templates; each template reads what it needs
#[derive(Debug, Clone)]
pub struct TemplateParams {
    pub days: u32,
    pub limit: u64,
    pub enabled_only: bool,
    pub campaign_id: Option<String>,
}

impl Default for TemplateParams {
    fn default() -> Self {
        Self {
            days: 7,
            limit: 50,
            enabled_only: true,
            campaign_id: None,
        }
    }
}

fn last_days(days: u32) -> String {
    format!("LAST_{}_DAYS", days)
}

fn with_campaign(builder: GaqlBuilder, campaign_id: Option<&str>) -> GaqlBuilder {
    match campaign_id {
        Some(id) => builder.add_filter(format!("campaign.id = {}", id)),
        None => builder,
    }
}

pub struct QueryTemplates;

impl QueryTemplates {
    /// Campaign performance sorted by spend
    pub fn campaign_performance(days: u32, enabled_only: bool, limit: u64) -> AppResult<String> {
        let status = if enabled_only {
            "campaign.status = ENABLED"
        } else {
            "campaign.status != REMOVED"
        };

        GaqlBuilder::new()
            .add_select([
                "campaign.id",
                "campaign.name",
                "campaign.status",
                "campaign.advertising_channel_type",
                "metrics.impressions",
                "metrics.clicks",
                "metrics.ctr",
                "metrics.cost_micros",
                "metrics.conversions",
                "metrics.conversions_value",
                "metrics.cost_per_conversion",
                "metrics.average_cpc",
            ])
            .set_source("campaign")
            .add_date_range(&last_days(days))
            .add_filter(status)
            .add_order("metrics.cost_micros", true)
            .set_limit(limit)
            .build()
    }

    /// All non-removed conversion actions
    pub fn conversion_actions() -> AppResult<String> {
        GaqlBuilder::new()
            .add_select([
                "conversion_action.id",
                "conversion_action.name",
                "conversion_action.type",
                "conversion_action.category",
                "conversion_action.status",
                "conversion_action.include_in_conversions_metric",
            ])
            .set_source("conversion_action")
            .add_filter("conversion_action.status != REMOVED")
            .add_order("conversion_action.name", false)
            .build()
    }

    pub fn conversion_performance(days: u32, limit: u64) -> AppResult<String> {
        GaqlBuilder::new()
            .add_select([
                "conversion_action.id",
                "conversion_action.name",
                "conversion_action.type",
                "conversion_action.category",
                "metrics.conversions",
                "metrics.conversions_value",
                "metrics.all_conversions",
                "metrics.all_conversions_value",
            ])
            .set_source("conversion_action")
            .add_date_range(&last_days(days))
            .add_filter("conversion_action.status = ENABLED")
            .add_order("metrics.conversions", true)
            .set_limit(limit)
            .build()
    }

    /// Search term report, optionally for one campaign
    pub fn search_terms(days: u32, campaign_id: Option<&str>, limit: u64) -> AppResult<String> {
        let builder = GaqlBuilder::new()
            .add_select([
                "campaign.id",
                "campaign.name",
                "ad_group.id",
                "ad_group.name",
                "search_term_view.search_term",
                "search_term_view.status",
                "metrics.impressions",
                "metrics.clicks",
                "metrics.cost_micros",
                "metrics.conversions",
            ])
            .set_source("search_term_view")
            .add_date_range(&last_days(days));

        with_campaign(builder, campaign_id)
            .add_order("metrics.impressions", true)
            .set_limit(limit)
            .build()
    }

    pub fn ad_group_performance(days: u32, campaign_id: Option<&str>, limit: u64) -> AppResult<String> {
        let builder = GaqlBuilder::new()
            .add_select([
                "campaign.id",
                "campaign.name",
                "ad_group.id",
                "ad_group.name",
                "ad_group.status",
                "metrics.impressions",
                "metrics.clicks",
                "metrics.ctr",
                "metrics.cost_micros",
                "metrics.conversions",
            ])
            .set_source("ad_group")
            .add_date_range(&last_days(days))
            .add_filter("ad_group.status != REMOVED");

        with_campaign(builder, campaign_id)
            .add_order("metrics.cost_micros", true)
            .set_limit(limit)
            .build()
    }

    pub fn keyword_performance(days: u32, campaign_id: Option<&str>, limit: u64) -> AppResult<String> {
        let builder = GaqlBuilder::new()
            .add_select([
                "campaign.name",
                "ad_group.name",
                "ad_group_criterion.keyword.text",
                "ad_group_criterion.keyword.match_type",
                "ad_group_criterion.quality_info.quality_score",
                "metrics.impressions",
                "metrics.clicks",
                "metrics.ctr",
                "metrics.cost_micros",
                "metrics.conversions",
            ])
            .set_source("keyword_view")
            .add_date_range(&last_days(days))
            .add_filter("ad_group_criterion.status != REMOVED");

        with_campaign(builder, campaign_id)
            .add_order("metrics.clicks", true)
            .set_limit(limit)
            .build()
    }

    /// Performance Max asset groups, optionally for one campaign
    pub fn asset_group_performance(days: u32, campaign_id: Option<&str>, limit: u64) -> AppResult<String> {
        let builder = GaqlBuilder::new()
            .add_select([
                "campaign.id",
                "campaign.name",
                "asset_group.id",
                "asset_group.name",
                "asset_group.status",
                "metrics.impressions",
                "metrics.clicks",
                "metrics.ctr",
                "metrics.cost_micros",
                "metrics.conversions",
                "metrics.conversions_value",
            ])
            .set_source("asset_group")
            .add_date_range(&last_days(days))
            .add_filter("campaign.advertising_channel_type = PERFORMANCE_MAX");

        with_campaign(builder, campaign_id)
            .add_order("metrics.cost_micros", true)
            .set_limit(limit)
            .build()
    }

    /// Asset group breakdown of one Performance Max campaign; no row limit
    pub fn pmax_insights(campaign_id: &str, days: u32) -> AppResult<String> {
        GaqlBuilder::new()
            .add_select([
                "asset_group.id",
                "asset_group.name",
                "asset_group.status",
                "asset_group.final_urls",
                "metrics.impressions",
                "metrics.clicks",
                "metrics.ctr",
                "metrics.cost_micros",
                "metrics.conversions",
                "metrics.conversions_value",
                "metrics.cost_per_conversion",
            ])
            .set_source("asset_group")
            .add_filter(format!("campaign.id = {}", campaign_id))
            .add_filter("campaign.advertising_channel_type = PERFORMANCE_MAX")
            .add_date_range(&last_days(days))
            .add_order("metrics.cost_micros", true)
            .build()
    }

    /// Enabled campaigns broken down by country
    pub fn geographic_performance(days: u32, limit: u64) -> AppResult<String> {
        GaqlBuilder::new()
            .add_select([
                "campaign.id",
                "campaign.name",
                "geographic_view.country_criterion_id",
                "geographic_view.location_type",
                "metrics.impressions",
                "metrics.clicks",
                "metrics.ctr",
                "metrics.cost_micros",
                "metrics.conversions",
            ])
            .set_source("geographic_view")
            .add_date_range(&last_days(days))
            .add_filter("campaign.status = ENABLED")
            .add_order("metrics.clicks", true)
            .set_limit(limit)
            .build()
    }

    pub fn audience_performance(days: u32, limit: u64) -> AppResult<String> {
        GaqlBuilder::new()
            .add_select([
                "campaign.id",
                "campaign.name",
                "ad_group.id",
                "ad_group.name",
                "ad_group_criterion.user_list.name",
                "metrics.impressions",
                "metrics.clicks",
                "metrics.ctr",
                "metrics.cost_micros",
                "metrics.conversions",
            ])
            .set_source("user_list_view")
            .add_date_range(&last_days(days))
            .add_order("metrics.clicks", true)
            .set_limit(limit)
            .build()
    }

    /// Resolve a template by name, e.g. from the command line
    pub fn by_name(name: &str, params: &TemplateParams) -> AppResult<String> {
        let campaign_id = params.campaign_id.as_deref();
        match name {
            "campaign_performance" => {
                Self::campaign_performance(params.days, params.enabled_only, params.limit)
            }
            "conversion_actions" => Self::conversion_actions(),
            "conversion_performance" => Self::conversion_performance(params.days, params.limit),
            "search_terms" => Self::search_terms(params.days, campaign_id, params.limit),
            "ad_group_performance" => {
                Self::ad_group_performance(params.days, campaign_id, params.limit)
            }
            "keyword_performance" => Self::keyword_performance(params.days, campaign_id, params.limit),
            "asset_group_performance" => {
                Self::asset_group_performance(params.days, campaign_id, params.limit)
            }
            "pmax_insights" => match campaign_id {
                Some(id) => Self::pmax_insights(id, params.days),
                None => Err(XwanderError::malformed_query(
                    "pmax_insights requires a campaign id",
                )),
            },
            "geographic_performance" => Self::geographic_performance(params.days, params.limit),
            "audience_performance" => Self::audience_performance(params.days, params.limit),
            other => Err(XwanderError::not_found(format!(
                "Unknown template '{}' (available: {})",
                other,
                TEMPLATE_NAMES.join(", ")
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaql::validate;

    #[test]
    fn test_every_template_validates() {
        let params = TemplateParams {
            campaign_id: Some("123".to_string()),
            ..Default::default()
        };
        for name in TEMPLATE_NAMES {
            let query = QueryTemplates::by_name(name, &params).unwrap();
            assert!(validate(&query).unwrap(), "{} did not validate", name);
        }
    }

    #[test]
    fn test_campaign_performance_clauses() {
        let query = QueryTemplates::campaign_performance(30, true, 25).unwrap();
        assert!(query.contains("FROM campaign"));
        assert!(query.contains("segments.date DURING LAST_30_DAYS AND campaign.status = ENABLED"));
        assert!(query.ends_with("ORDER BY metrics.cost_micros DESC LIMIT 25"));

        let all = QueryTemplates::campaign_performance(7, false, 50).unwrap();
        assert!(all.contains("campaign.status != REMOVED"));
    }

    #[test]
    fn test_campaign_filter_is_optional() {
        let scoped = QueryTemplates::search_terms(14, Some("987"), 100).unwrap();
        assert!(scoped.contains("campaign.id = 987"));

        let unscoped = QueryTemplates::search_terms(14, None, 100).unwrap();
        assert!(!unscoped.contains("campaign.id ="));
    }

    #[test]
    fn test_performance_max_templates() {
        let query = QueryTemplates::asset_group_performance(30, Some("555"), 50).unwrap();
        assert!(query.contains("FROM asset_group"));
        assert!(query.contains(
            "WHERE segments.date DURING LAST_30_DAYS AND campaign.advertising_channel_type = PERFORMANCE_MAX \
             AND campaign.id = 555"
        ));

        let insights = QueryTemplates::pmax_insights("555", 30).unwrap();
        assert!(insights.contains("asset_group.final_urls"));
        assert!(insights.contains("campaign.id = 555 AND campaign.advertising_channel_type = PERFORMANCE_MAX"));
        assert!(!insights.contains("LIMIT"));

        let err = QueryTemplates::by_name("pmax_insights", &TemplateParams::default()).unwrap_err();
        assert!(err.to_string().contains("requires a campaign id"));
    }

    #[test]
    fn test_geographic_and_audience_templates() {
        let geo = QueryTemplates::geographic_performance(7, 20).unwrap();
        assert!(geo.contains("FROM geographic_view"));
        assert!(geo.ends_with("ORDER BY metrics.clicks DESC LIMIT 20"));

        let audience = QueryTemplates::by_name("audience_performance", &TemplateParams::default()).unwrap();
        assert!(audience.contains("ad_group_criterion.user_list.name"));
        assert!(audience.contains("FROM user_list_view WHERE segments.date DURING LAST_7_DAYS ORDER BY"));
    }

    #[test]
    fn test_unknown_template() {
        let err = QueryTemplates::by_name("nope", &TemplateParams::default()).unwrap_err();
        assert!(err.to_string().contains("Unknown template 'nope'"));
        assert_eq!(err.code(), crate::common::ErrorCode::NotFound);
    }
}
