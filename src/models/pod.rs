//! Pod status helpers

use super::ResourceObject;

/// Human-readable pod status, as shown by cluster dashboards
///
/// `Evicted` and `Terminating` win over everything else, then the reason of the
/// last waiting/terminated container, then `status.phase`.
pub fn pod_status_message(pod: &ResourceObject) -> String {
    if pod.str_at("/status/reason") == Some("Evicted") {
        return "Evicted".to_string();
    }
    if pod.get("/metadata/deletionTimestamp").is_some() {
        return "Terminating".to_string();
    }

    let mut message = None;
    for status in pod.array_at("/status/containerStatuses") {
        let Some(state) = status.get("state") else {
            continue;
        };
        if let Some(waiting) = state.get("waiting") {
            message = Some(
                waiting
                    .get("reason")
                    .and_then(|r| r.as_str())
                    .unwrap_or("Waiting")
                    .to_string(),
            );
        }
        if let Some(terminated) = state.get("terminated") {
            message = Some(
                terminated
                    .get("reason")
                    .and_then(|r| r.as_str())
                    .unwrap_or("Terminated")
                    .to_string(),
            );
        }
    }

    message.unwrap_or_else(|| pod.str_at("/status/phase").unwrap_or("Unknown").to_string())
}

/// (ready, total) container counts
pub fn pod_ready_containers(pod: &ResourceObject) -> (usize, usize) {
    let total = pod.array_at("/spec/containers").len();
    let ready = pod
        .array_at("/status/containerStatuses")
        .iter()
        .filter(|s| s.get("ready").and_then(|r| r.as_bool()) == Some(true))
        .count();
    (ready, total)
}
