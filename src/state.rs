use std::sync::Arc;

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::booking::{BookingApi, BookingOrchestrator};
use crate::services::intent_parser::IntentParser;
use crate::services::message_store::MessageStore;
use crate::services::reply_gate::ReplyGate;
use crate::services::tools::{BookingTools, ToolExecutor};

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<MessageStore>,
    pub gate: ReplyGate,
    pub orchestrator: Arc<BookingOrchestrator>,
    pub tools: Box<dyn ToolExecutor>,
}

impl AppState {
    pub fn new(config: AppConfig, conn: Connection, api: Arc<dyn BookingApi>) -> anyhow::Result<Self> {
        let offset = config.local_offset()?;

        let store = Arc::new(MessageStore::new(conn, offset, config.clock_skew()));
        let gate = ReplyGate::new(Arc::clone(&store), config.reply_window());
        let orchestrator = Arc::new(BookingOrchestrator::new(
            Arc::clone(&api),
            IntentParser::new(offset),
            config.booking_call_deadline(),
        ));
        let tools = Box::new(BookingTools::new(api, Arc::clone(&orchestrator)));

        Ok(Self {
            config,
            store,
            gate,
            orchestrator,
            tools,
        })
    }
}
