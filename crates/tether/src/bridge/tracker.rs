use tracing::debug;

use super::Bridge;
use crate::engine::Engine;
use crate::store::{RecordStore, UiLayer};
use tether_api::{BridgeResult, EngineId, SelectedObject, Selection};

impl<E, S, U> Bridge<E, S, U>
where
    E: Engine,
    S: RecordStore,
    U: UiLayer,
{
    /// Resolve the engine's active source and its representation in the
    /// active view, then publish them as the current selection.
    ///
    /// Watchers are only woken when the selection actually changed.
    pub fn on_active_change(&mut self) -> BridgeResult<Selection> {
        let source = self.engine.active_source();
        let view = self.engine.active_view();
        let representation = source
            .as_ref()
            .and_then(|s| self.engine.representation(s, view.as_ref()));

        let selection = Selection {
            source: self.select(source)?,
            representation: self.select(representation)?,
        };

        let published = selection.clone();
        let changed = self.selection.send_if_modified(|current| {
            if *current == published {
                false
            } else {
                *current = published;
                true
            }
        });
        debug!("[Tracker] selection {:?} (changed: {})", selection, changed);
        Ok(selection)
    }

    fn select(&mut self, object: Option<EngineId>) -> BridgeResult<Option<SelectedObject>> {
        let record = self.resolve(object.as_ref())?;
        Ok(object
            .zip(record)
            .map(|(object, record)| SelectedObject { object, record }))
    }
}
