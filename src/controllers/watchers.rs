use std::fmt::Debug;

use futures::StreamExt;
use kube::{
    runtime::{
        watcher::{self, Event},
        WatchStreamExt,
    },
    Api, Resource, ResourceExt,
};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::Debouncer;

/// Watch scoping shared by every watched collection.
pub fn watcher_config(label_selector: Option<&str>) -> watcher::Config {
    match label_selector {
        Some(selector) => watcher::Config::default().labels(selector),
        None => watcher::Config::default(),
    }
}

/// Feeds every change of one collection into the debouncer until cancelled.
///
/// Watch errors are logged; the stream backs off and resumes on its own.
pub async fn watch<R>(api: Api<R>, config: watcher::Config, debouncer: Debouncer, cancellation: CancellationToken)
where
    R: Resource + Clone + DeserializeOwned + Debug + Send + 'static,
    R::DynamicType: Default,
{
    let resource = crate::format_resource::<R>();
    info!("{resource} watcher...started");
    let mut events = watcher::watcher(api, config).default_backoff().boxed();

    loop {
        tokio::select! {
            () = cancellation.cancelled() => break,
            event = events.next() => match event {
                Some(Ok(Event::Apply(object) | Event::Delete(object))) => {
                    debug!("{resource} {} changed", object.name_any());
                    debouncer.notify();
                },
                Some(Ok(Event::InitDone)) => {
                    debug!("{resource} initial listing done");
                    debouncer.notify();
                },
                Some(Ok(Event::Init | Event::InitApply(_))) => {},
                Some(Err(e)) => warn!("{resource} watch error {e}"),
                None => break,
            },
        }
    }
    info!("{resource} watcher...stopped");
}
