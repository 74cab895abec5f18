//! Schema Registry
//!
//! Process-wide keyed store of validated entity graphs, one per protocol.
//! Parsing, building and validation run outside the lock; only the final
//! swap of the entry happens under the write lock, so readers always see
//! either the previous graph or the new one, never a partial build.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::checksum::Checksum;
use crate::config::ValidationConfig;
use crate::error::{Result, SchemaError};
use crate::graph::{build_with, BuildOptions, Diagnostics, EntityGraph};
use crate::sdl::parse;
use crate::sources::SchemaSource;
use crate::validate::Validator;

/// Outcome of a single `register` call
pub type RegisterResult = std::result::Result<Registration, Diagnostics>;

/// A stored, validated schema
#[derive(Debug)]
pub struct RegisteredSchema {
    pub protocol_id: String,
    pub graph: Arc<EntityGraph>,
    /// Warning-level findings from validation
    pub warnings: Diagnostics,
    pub checksum: Checksum,
    pub registered_at: DateTime<Utc>,
}

/// Successful registration
#[derive(Debug, Clone)]
pub struct Registration {
    pub graph: Arc<EntityGraph>,
    pub warnings: Diagnostics,
    /// A previous entry for the protocol was replaced
    pub replaced: bool,
    /// The SDL matched the current entry; nothing was rebuilt
    pub unchanged: bool,
}

/// The schema registry
pub struct SchemaRegistry {
    entries: RwLock<IndexMap<String, Arc<RegisteredSchema>>>,
    build_options: BuildOptions,
    validator: Validator,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    /// Registry with default validation options and no private fields
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(IndexMap::new()),
            build_options: BuildOptions::default(),
            validator: Validator::default(),
        }
    }

    /// Registry configured from `[validation]`
    pub fn with_config(config: &ValidationConfig) -> Result<Self> {
        Ok(Self {
            entries: RwLock::new(IndexMap::new()),
            build_options: config.build_options()?,
            validator: Validator::new(config.validation_options()),
        })
    }

    /// Parse, build and validate `sdl`, then store it under `protocol_id`.
    ///
    /// Any error-level diagnostic rejects the document and leaves the
    /// prior entry untouched. Warnings are returned with the graph.
    pub fn register(&self, protocol_id: &str, sdl: &str) -> RegisterResult {
        let checksum = Checksum::of_sdl(sdl);

        if let Some(existing) = self.entry(protocol_id) {
            if existing.checksum == checksum {
                tracing::debug!(protocol = protocol_id, checksum = checksum.short(), "schema unchanged");
                return Ok(Registration {
                    graph: Arc::clone(&existing.graph),
                    warnings: existing.warnings.clone(),
                    replaced: false,
                    unchanged: true,
                });
            }
        }

        let doc = match parse(sdl) {
            Ok(doc) => doc,
            Err(err) => {
                tracing::warn!(protocol = protocol_id, error = %err, "schema rejected: syntax error");
                return Err(Diagnostics::from(err));
            }
        };

        // Validator findings supersede the builder's unresolved-name report
        let (graph, _) = build_with(&doc, &self.build_options);
        let diagnostics = self.validator.validate(&graph);

        if diagnostics.has_errors() {
            tracing::warn!(
                protocol = protocol_id,
                errors = diagnostics.error_count(),
                "schema rejected"
            );
            return Err(diagnostics);
        }

        let warnings = diagnostics.into_warnings();
        let graph = Arc::new(graph);
        let entry = Arc::new(RegisteredSchema {
            protocol_id: protocol_id.to_string(),
            graph: Arc::clone(&graph),
            warnings: warnings.clone(),
            checksum,
            registered_at: Utc::now(),
        });

        let replaced = self.entries.write().insert(protocol_id.to_string(), entry).is_some();

        tracing::info!(
            protocol = protocol_id,
            types = graph.len(),
            warnings = warnings.len(),
            replaced,
            "schema registered"
        );

        Ok(Registration {
            graph,
            warnings,
            replaced,
            unchanged: false,
        })
    }

    /// Register every source in order, collecting each outcome
    pub fn register_all<I>(&self, sources: I) -> Vec<(String, RegisterResult)>
    where
        I: IntoIterator<Item = SchemaSource>,
    {
        sources
            .into_iter()
            .map(|source| {
                let outcome = self.register(&source.protocol_id, &source.sdl);
                (source.protocol_id, outcome)
            })
            .collect()
    }

    /// The current graph for a protocol
    pub fn get(&self, protocol_id: &str) -> Option<Arc<EntityGraph>> {
        self.entries.read().get(protocol_id).map(|e| Arc::clone(&e.graph))
    }

    /// Like [`get`](Self::get), failing with `NotFound`
    pub fn require(&self, protocol_id: &str) -> Result<Arc<EntityGraph>> {
        self.get(protocol_id)
            .ok_or_else(|| SchemaError::NotFound(protocol_id.to_string()))
    }

    /// The full stored entry, including checksum and timestamp
    pub fn entry(&self, protocol_id: &str) -> Option<Arc<RegisteredSchema>> {
        self.entries.read().get(protocol_id).cloned()
    }

    /// Registered protocol ids in order of first registration
    pub fn list(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Remove a protocol; true if it was registered
    pub fn unregister(&self, protocol_id: &str) -> bool {
        let removed = self.entries.write().shift_remove(protocol_id).is_some();
        if removed {
            tracing::info!(protocol = protocol_id, "schema unregistered");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
