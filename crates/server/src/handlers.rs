use super::Handles;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::Responder;
use actix_web::web;
use qzs_core::ID;
use qzs_gameroom::Session;
use std::collections::HashMap;

pub async fn health() -> impl Responder {
    HttpResponse::Ok().body("ok")
}

/// WebSocket upgrade. A reconnecting client passes its previous id as
/// `?session=<uuid>` to keep its player record across sockets; anyone else
/// gets a fresh identity.
pub async fn connect(
    handles: web::Data<Handles>,
    query: web::Query<HashMap<String, String>>,
    body: web::Payload,
    req: HttpRequest,
) -> impl Responder {
    let session: ID<Session> = query
        .get("session")
        .and_then(|s| uuid::Uuid::parse_str(s).ok())
        .map(ID::from)
        .unwrap_or_default();
    match actix_ws::handle(&req, body) {
        Ok((response, ws, stream)) => {
            log::info!("session {} connected", session);
            qzs_hosting::bridge(
                handles.gateway.clone(),
                handles.commands.clone(),
                session,
                ws,
                stream,
            );
            response
        }
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}
