use actix_web::{web, HttpResponse};

use super::StatsData;
use crate::api::error::Result;

/// Configure stats routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/stats", web::get().to(get_stats));
}

/// Public network stats, cached upstream
pub async fn get_stats(stats: StatsData) -> Result<HttpResponse> {
    let snapshot = stats.get_stats().await?;
    Ok(HttpResponse::Ok().json(snapshot.as_ref()))
}
