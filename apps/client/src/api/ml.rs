use std::sync::Arc;

use crate::api::ServiceClient;
use crate::errors::ApiError;
use crate::gateway::{ApiRequest, Gateway};
use crate::models::ml::{
    AnalyticsOverview, CompanyMetrics, GetRecommendationsParams, RecommendationsResponse,
};

/// Client for the ML recommendation service. Its payloads are bare JSON,
/// so every call uses `send_bare` rather than the envelope decoder.
#[derive(Clone)]
pub struct MlClient {
    service: ServiceClient,
}

impl MlClient {
    pub fn new(gateway: Arc<Gateway>, ml_api_url: &str) -> Self {
        Self {
            service: ServiceClient::new(gateway, ml_api_url),
        }
    }

    pub async fn get_recommendations(
        &self,
        user_id: &str,
        params: &GetRecommendationsParams,
    ) -> Result<RecommendationsResponse, ApiError> {
        let request = ApiRequest::get(self.service.url(&format!("/recommendations/{user_id}")))
            .query_opt("limit", params.limit.filter(|l| *l > 0))
            .query_opt("tier", params.tier.map(|t| t.as_str()));
        self.service.send_bare(request).await
    }

    pub async fn get_analytics_overview(&self, user_id: &str) -> Result<AnalyticsOverview, ApiError> {
        self.service
            .send_bare(ApiRequest::get(
                self.service.url(&format!("/analytics/{user_id}/overview")),
            ))
            .await
    }

    pub async fn get_company_metrics(&self, company_id: &str) -> Result<CompanyMetrics, ApiError> {
        self.service
            .send_bare(ApiRequest::get(
                self.service.url(&format!("/analytics/companies/{company_id}")),
            ))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::*;
    use crate::models::ml::{RecommendationSource, Tier};
    use serde_json::json;

    fn client(transport: Arc<FakeTransport>) -> MlClient {
        MlClient::new(gateway(transport, credentials("a1", "r1")), ML_BASE)
    }

    #[tokio::test]
    async fn test_recommendations_are_decoded_without_envelope() {
        let transport = FakeTransport::new(|_| {
            respond(
                200,
                json!({
                    "recommendations": [{
                        "application_id": "app-1",
                        "score": 0.91,
                        "tier": "S",
                        "explanation": "Fast responder",
                        "company_name": "Acme",
                        "job_title": "Backend Engineer",
                        "company_metrics": {"response_rate": 0.8}
                    }],
                    "count": 1,
                    "source": "cache"
                }),
            )
        });

        let response = client(transport.clone())
            .get_recommendations(
                "u-1",
                &GetRecommendationsParams {
                    limit: Some(5),
                    tier: Some(Tier::S),
                },
            )
            .await
            .unwrap();

        assert_eq!(response.count, 1);
        assert_eq!(response.source, RecommendationSource::Cache);
        assert_eq!(response.recommendations[0].tier, Tier::S);

        let call = &transport.calls()[0];
        assert_eq!(call.url, format!("{ML_BASE}/recommendations/u-1"));
        assert_eq!(call.query_value("limit"), Some("5"));
        assert_eq!(call.query_value("tier"), Some("S"));
    }

    #[tokio::test]
    async fn test_company_metrics_accepts_legacy_field_name() {
        let transport = FakeTransport::new(|_| {
            respond(
                200,
                json!({
                    "company_id": "c-1",
                    "company_name": "Acme",
                    "avg_response_time_days": 4.5,
                    "total_applications": 12
                }),
            )
        });

        let metrics = client(transport.clone())
            .get_company_metrics("c-1")
            .await
            .unwrap();

        assert_eq!(metrics.average_response_time_days, Some(4.5));
        assert_eq!(
            transport.calls()[0].url,
            format!("{ML_BASE}/analytics/companies/c-1")
        );
    }

    #[tokio::test]
    async fn test_analytics_overview_route() {
        let transport = FakeTransport::new(|_| {
            respond(
                200,
                json!({
                    "total_applications": 40,
                    "success_rate": 0.1,
                    "avg_response_time": 6.0,
                    "recent_activity": [{"date": "2024-03-01", "applications_count": 3}]
                }),
            )
        });

        let overview = client(transport.clone())
            .get_analytics_overview("u-1")
            .await
            .unwrap();

        assert_eq!(overview.total_applications, 40);
        assert_eq!(overview.recent_activity.len(), 1);
        assert_eq!(
            transport.calls()[0].url,
            format!("{ML_BASE}/analytics/u-1/overview")
        );
    }
}
