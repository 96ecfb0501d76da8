// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::sync::mpsc::Sender;
use std::thread;
use tablehub_app::{
    LoadedView, OperationError, OperationRequest, OperationResponse, SnapshotStore, ViewId,
    ViewPath, ViewSnapshot,
};
use tablehub_client::Client;
use tablehub_store::Store;
use tablehub_tui::InternalEvent;

/// Wires the view server client and the local session store into the TUI.
pub struct ServerRuntime {
    client: Client,
    store: Store,
}

impl ServerRuntime {
    pub fn new(client: Client, store: Store) -> Self {
        Self { client, store }
    }
}

impl SnapshotStore for ServerRuntime {
    fn load_snapshot(&self, path: &ViewPath) -> Result<Option<ViewSnapshot>> {
        self.store.load_snapshot(path)
    }

    fn save_snapshot(&mut self, path: &ViewPath, snapshot: &ViewSnapshot) -> Result<()> {
        self.store.save_snapshot(path, snapshot)
    }

    fn put_handoff(&mut self, snapshot: &ViewSnapshot) -> Result<()> {
        self.store.put_handoff(snapshot)
    }

    fn take_handoff(&mut self) -> Result<Option<ViewSnapshot>> {
        self.store.take_handoff()
    }
}

impl tablehub_tui::AppRuntime for ServerRuntime {
    fn load_view(&mut self, view: &ViewId) -> Result<LoadedView> {
        self.client.load_view(view)
    }

    fn perform_operation(
        &mut self,
        view: &ViewId,
        request: &OperationRequest,
    ) -> Result<OperationResponse, OperationError> {
        self.client.perform(view, request)
    }

    /// Round-trips run on their own thread so the grid keeps redrawing.
    fn spawn_operation(
        &mut self,
        request_id: u64,
        view: ViewId,
        request: OperationRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let client = self.client.clone();
        thread::Builder::new()
            .name(format!("operation-{request_id}"))
            .spawn(move || {
                let result = client.perform(&view, &request);
                if tx
                    .send(InternalEvent::OperationFinished { request_id, result })
                    .is_err()
                {
                    tracing::debug!(request_id, "operation finished after the UI exited");
                }
            })
            .context("spawn operation thread")?;
        Ok(())
    }
}
