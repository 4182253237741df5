use super::Gateway;
use futures::StreamExt;
use qzs_core::ID;
use qzs_gameroom::Command;
use qzs_gameroom::Session;
use qzs_gameroom::decode;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Spawn the pump for one WebSocket endpoint.
///
/// Outbound frames win over inbound ones so a slow reader cannot starve the
/// scoreboard. When the socket closes for any reason, the endpoint is
/// unregistered and the core is told the session lost one endpoint; the
/// refcount decides whether the player actually goes away.
pub fn bridge(
    gateway: Arc<Gateway>,
    commands: UnboundedSender<Command>,
    session: ID<Session>,
    mut ws: actix_ws::Session,
    mut stream: actix_ws::MessageStream,
) {
    let (endpoint, mut outbound) = gateway.register(session);
    log::debug!("[bridge {}] connected", session);
    actix_web::rt::spawn(async move {
        'sesh: loop {
            tokio::select! {
                biased;
                msg = outbound.recv() => match msg {
                    Some(json) => if ws.text(json).await.is_err() { break 'sesh },
                    None => break 'sesh,
                },
                msg = stream.next() => match msg {
                    Some(Ok(actix_ws::Message::Text(text))) => {
                        if let Some(command) = decode(session, &text) {
                            if commands.send(command).is_err() { break 'sesh }
                        }
                    }
                    Some(Ok(actix_ws::Message::Close(_))) => break 'sesh,
                    Some(Err(_)) => break 'sesh,
                    None => break 'sesh,
                    _ => continue 'sesh,
                },
            }
        }
        gateway.unregister(session, endpoint);
        let _ = commands.send(Command::Disconnect { session });
        log::debug!("[bridge {}] disconnected", session);
    });
}
