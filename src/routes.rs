use crate::{
    api::{attendance, health, realtime},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::{Result, anyhow};
use std::sync::Arc;

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Rate limiters shared by every worker.
#[derive(Clone)]
pub struct Limiters {
    punch: Limiter,
    protected: Limiter,
}

impl Limiters {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            punch: build_limiter(config.rate_punch_per_min)?,
            protected: build_limiter(config.rate_protected_per_min)?,
        })
    }
}

fn build_limiter(requests_per_min: u32) -> Result<Limiter> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit: {requests_per_min} per minute"))?;
    Ok(Arc::new(Governor::new(&cfg)))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &Limiters) {
    // Public routes
    cfg.service(web::resource("/health").route(web::get().to(health::health)));

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiters.protected.clone()) // rate limiting
            .service(
                web::scope("/attendance")
                    // /attendance/checkin
                    .service(
                        web::resource("/checkin")
                            .wrap(limiters.punch.clone())
                            .route(web::post().to(attendance::check_in)),
                    )
                    // /attendance/checkout
                    .service(
                        web::resource("/checkout")
                            .wrap(limiters.punch.clone())
                            .route(web::put().to(attendance::check_out)),
                    )
                    .service(web::resource("/my-records").route(web::get().to(attendance::my_records)))
                    .service(web::resource("/today").route(web::get().to(attendance::today)))
                    // admin only
                    .service(web::resource("/all").route(web::get().to(attendance::all_records)))
                    .service(web::resource("/stats").route(web::get().to(attendance::stats))),
            )
            .service(
                web::scope("/realtime")
                    .service(web::resource("/stream").route(web::get().to(realtime::open_stream)))
                    // /realtime/{connection_id}/admin
                    .service(
                        web::resource("/{connection_id}/admin")
                            .route(web::post().to(realtime::join_admin))
                            .route(web::delete().to(realtime::leave_admin)),
                    )
                    // /realtime/{connection_id}/subject
                    .service(
                        web::resource("/{connection_id}/subject")
                            .route(web::post().to(realtime::join_subject)),
                    ),
            ),
    );
}
