use super::{describe, json_pretty, resolve_profile, EXIT_SUCCESS};
use lumen_core::{interrupt_requested, EngineHost, EventConsumer, LogConsumer};
use lumen_runtime::{AppContext, EngineEvent, EventKind};
use lumen_schema::LumenConfig;
use serde::Serialize;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;
use tracing::info;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Serialize)]
struct PlaySummary<'a> {
    file: &'a str,
    profile: &'static str,
    backend: String,
    outcome: &'static str,
    events: usize,
    commands: usize,
}

pub fn run(
    config: &LumenConfig,
    file: &str,
    profile: Option<&str>,
    backend: Option<&str>,
    exec: &[String],
    json_output: bool,
) -> Result<u8, String> {
    let profile = resolve_profile(config, profile)?;
    let mut config = config.clone();
    if let Some(backend) = backend {
        backend.clone_into(&mut config.engine.backend);
    }
    let host = EngineHost::from_config(&config).map_err(|e| describe(&e))?;

    let (tx, rx) = mpsc::channel();
    let mut log = LogConsumer;
    let forward = move |event: &EngineEvent| {
        log.on_event(event);
        let _ = tx.send(event.clone());
    };

    host.create(&AppContext::default())
        .map_err(|e| describe(&e))?;
    let session = host
        .apply_profile_named(profile.name)
        .and_then(|()| host.init_with(Box::new(forward)))
        .and_then(|()| host.dispatch(&["loadfile", file]))
        .and_then(|()| exec.iter().try_for_each(|cmd| host.dispatch_string(cmd)));

    let result = match session {
        Ok(()) => {
            info!("playing {file} with profile '{}'", profile.name);
            let (outcome, events) = wait_for_end(&rx);
            Ok(PlaySummary {
                file,
                profile: profile.name,
                backend: host.backend_name().to_owned(),
                outcome,
                events,
                commands: exec.len() + 1,
            })
        }
        Err(e) => Err(describe(&e)),
    };
    host.destroy().map_err(|e| describe(&e))?;

    let summary = result?;
    if json_output {
        println!("{}", json_pretty(&summary)?);
    } else {
        println!(
            "{} ({} profile, {} backend): {}, {} events",
            summary.file, summary.profile, summary.backend, summary.outcome, summary.events
        );
    }
    Ok(EXIT_SUCCESS)
}

/// Block until the file ends, the engine shuts down, or the user interrupts.
fn wait_for_end(rx: &Receiver<EngineEvent>) -> (&'static str, usize) {
    let mut events = 0usize;
    loop {
        if interrupt_requested() {
            return ("interrupted", events);
        }
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => {
                events += 1;
                match event.kind {
                    EventKind::EndFile => return ("finished", events),
                    EventKind::Shutdown => return ("engine shutdown", events),
                    _ => {}
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return ("event pump stopped", events),
        }
    }
}
