pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod liveness;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use crate::services::{
    cheating_service::CheatingService, message_service::MessageService,
    participant_service::ParticipantService, ranking_service::RankingService,
    session_service::SessionService,
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub session_service: SessionService,
    pub participant_service: ParticipantService,
    pub cheating_service: CheatingService,
    pub message_service: MessageService,
    pub ranking_service: RankingService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let session_service = SessionService::new(pool.clone());
        let participant_service = ParticipantService::new(pool.clone());
        let cheating_service = CheatingService::new(pool.clone());
        let message_service = MessageService::new(pool.clone());
        let ranking_service = RankingService::new(pool.clone());

        Self {
            pool,
            session_service,
            participant_service,
            cheating_service,
            message_service,
            ranking_service,
        }
    }
}
