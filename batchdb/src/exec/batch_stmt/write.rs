// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
use crate::exec::batch_stmt::{apply_subset, BatchContext, BatchStatementExecutor, Outcomes};
use crate::exec::error::BatchError;
use crate::exec::result::{ErrorDescriptor, ErrorKind, RecordResult};
use crate::record::Record;
use crate::store::WriteKind;

/// Executor for plain INSERT, UPDATE and DELETE batches
pub struct WriteExecutor {
    kind: WriteKind,
}

impl WriteExecutor {
    pub fn new(kind: WriteKind) -> Self {
        Self { kind }
    }

    fn precheck(&self, record: &Record) -> Option<ErrorDescriptor> {
        match self.kind {
            WriteKind::Insert if record.has_identity() => Some(ErrorDescriptor::validation(
                "identity cannot be set on insert",
                ["identity"],
            )),
            WriteKind::Update | WriteKind::Delete if !record.has_identity() => {
                Some(ErrorDescriptor::new(
                    ErrorKind::MissingIdentity,
                    format!("{} requires a record identity", self.kind),
                ))
            }
            _ => None,
        }
    }
}

impl BatchStatementExecutor for WriteExecutor {
    fn execute(&self, context: &mut BatchContext<'_>) -> Result<Vec<RecordResult>, BatchError> {
        let mut outcomes = Outcomes::new(context.len(), context.all_or_nothing);
        for (index, record) in context.records.iter().enumerate() {
            if let Some(error) = self.precheck(record) {
                outcomes.reject(index, error)?;
            }
        }

        let indices = outcomes.pending();
        let subset: Vec<Record> = indices
            .iter()
            .map(|&index| context.records[index].clone())
            .collect();
        let results = apply_subset(
            context.store,
            self.kind,
            &subset,
            &indices,
            context.all_or_nothing,
        )?;
        outcomes.fill(&indices, results)?;

        let results = outcomes.finish()?;
        if self.kind == WriteKind::Insert {
            context.assign_identities(&results);
        }
        Ok(results)
    }

    fn operation_description(&self) -> String {
        self.kind.to_string().to_uppercase()
    }
}
