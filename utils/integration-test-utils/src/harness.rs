//! Started core wired to the recording doubles.

use crate::{MemoryStorage, RecordingDispatch};
use dtn_core::{BaseEidFactory, CoreCollaborators, CoreConfig, DtnCore};
use std::sync::Arc;

/// A started core wired to in-memory collaborators.
pub struct CoreHarness {
    pub core: DtnCore,
    pub storage: Arc<MemoryStorage>,
    pub dispatch: Arc<RecordingDispatch>,
}

impl CoreHarness {
    pub fn start(config: CoreConfig) -> Self {
        crate::init_tracing();
        let storage = Arc::new(MemoryStorage::new());
        let dispatch = Arc::new(RecordingDispatch::new());
        let core = DtnCore::new(
            config,
            CoreCollaborators {
                dispatch: dispatch.clone(),
                storage: storage.clone(),
                eid_factory: Arc::new(BaseEidFactory),
            },
        )
        .expect("valid test configuration");
        core.start().expect("core start");
        Self {
            core,
            storage,
            dispatch,
        }
    }

    pub fn with_local_eid(local_eid: &str) -> Self {
        Self::start(CoreConfig {
            local_eid: local_eid.to_string(),
            ..CoreConfig::default()
        })
    }
}

impl Default for CoreHarness {
    fn default() -> Self {
        Self::start(CoreConfig::default())
    }
}
