//! Quizsync Server
//!
//! Wires the cadence engine, the serial game core, and the WebSocket
//! gateway into a single actix-web server.
//!
//! ## Submodules
//!
//! - [`handlers`] — `/ws` upgrade and `/health` endpoints

pub mod handlers;

use actix_cors::Cors;
use actix_web::App;
use actix_web::HttpServer;
use actix_web::middleware::Logger;
use actix_web::web;
use qzs_gameroom::Clock;
use qzs_gameroom::ClockConfig;
use qzs_gameroom::Command;
use qzs_gameroom::RoundConfig;
use qzs_gameroom::ServerCore;
use qzs_hosting::Gateway;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::unbounded_channel;

/// Server options assembled by the CLI.
#[derive(Debug, Clone)]
pub struct Options {
    pub bind: String,
    pub round: RoundConfig,
    pub clock: ClockConfig,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            bind: qzs_core::DEFAULT_BIND.to_string(),
            round: RoundConfig::default(),
            clock: ClockConfig::default(),
        }
    }
}

/// Shared handles the connection handler needs: the gateway for endpoint
/// registration and the serial core's inbound command channel.
pub struct Handles {
    pub gateway: Arc<Gateway>,
    pub commands: UnboundedSender<Command>,
}

pub async fn run(options: Options) -> Result<(), std::io::Error> {
    let gateway = Arc::new(Gateway::new());
    let (tick_tx, tick_rx) = unbounded_channel();
    let (command_tx, command_rx) = unbounded_channel();
    let mut clock = Clock::new(options.clock);
    let alignment = clock.start(tick_tx);
    let core = ServerCore::new(options.round, gateway.clone(), alignment);
    tokio::spawn(core.run(tick_rx, command_rx));
    let handles = web::Data::new(Handles {
        gateway,
        commands: command_tx,
    });
    log::info!("starting quizsync server on {}", options.bind);
    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%r %s %Ts"))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header(),
            )
            .app_data(handles.clone())
            .route("/health", web::get().to(handlers::health))
            .route("/ws", web::get().to(handlers::connect))
    })
    .bind(&options.bind)?
    .run()
    .await;
    clock.stop();
    server
}
