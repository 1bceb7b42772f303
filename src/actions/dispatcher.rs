//! Applies the action to matched tokens
//!
//! Tokens are handled one at a time, in the order they were selected.
//! Mutations are persisted before the next token is touched. A failure on
//! one token becomes a failed [`ActionOutcome`] and never stops the run;
//! only a broken output channel does.
//!
//! Payload (listings, exports, status lines) goes to `out`. Failures,
//! skips and the export key banner go to `diag`.

use std::io::Write;

use crate::codec::{csv_row, PskcWriter, TokenDocument};
use crate::selection::MatchResult;
use crate::store::{Backend, TokenRecord};

use super::action::{Action, ExportFormat};
use super::errors::{ActionError, ActionResult};
use super::list::{list_row, owner_key, Owner, OwnerSummary};
use super::outcome::{ActionOutcome, OutcomeSink};

/// Result of a mutation that did not fail
struct Applied {
    detail: String,
    /// Lines for the output channel, empty when nothing was written
    status: Vec<String>,
}

impl Applied {
    fn changed(detail: impl Into<String>, status: Vec<String>) -> Self {
        Self {
            detail: detail.into(),
            status,
        }
    }

    fn unchanged(detail: impl Into<String>) -> Self {
        Self::changed(detail, Vec::new())
    }
}

pub struct ActionDispatcher<W: Write, D: Write> {
    action: Action,
    out: W,
    diag: D,
    summary: OwnerSummary,
    pskc: Option<PskcWriter>,
    header_written: bool,
}

impl<W: Write, D: Write> ActionDispatcher<W, D> {
    pub fn new(action: Action, out: W, diag: D) -> Self {
        let pskc = matches!(
            action,
            Action::Export {
                format: ExportFormat::Pskc,
                ..
            }
        )
        .then(PskcWriter::new);

        Self {
            action,
            out,
            diag,
            summary: OwnerSummary::default(),
            pskc,
            header_written: false,
        }
    }

    /// Pre-shared key of a PSKC export, as hex
    pub fn export_key_hex(&self) -> Option<String> {
        self.pskc.as_ref().map(PskcWriter::key_hex)
    }

    /// Apply the action to every token of a batch, feeding `sink` as it goes
    pub fn apply_batch<B: Backend>(
        &mut self,
        matched: MatchResult,
        backend: &mut B,
        sink: &mut dyn OutcomeSink,
    ) -> ActionResult<()> {
        for token in matched {
            let outcome = self.apply(token, backend)?;
            sink.record(outcome);
        }
        Ok(())
    }

    /// Apply the action to a single token.
    ///
    /// Errors are reserved for the output channel. Everything scoped to
    /// the token ends up in the returned outcome.
    pub fn apply<B: Backend>(&mut self, token: TokenRecord, backend: &mut B) -> ActionResult<ActionOutcome> {
        match &self.action {
            Action::List {
                summary,
                attributes,
            } => {
                let owner = Owner::of(&token, &*backend);
                if matches!(owner, Owner::Unresolved) {
                    writeln!(self.diag, "Failed to determine user for token {}.", token.serial)?;
                }
                if *summary {
                    self.summary.add(owner_key(&owner, attributes));
                } else {
                    writeln!(self.out, "{}", list_row(&token, &owner, attributes))?;
                }
                Ok(ActionOutcome::ok(token.serial, "listed"))
            }
            Action::Export { format, b32 } => {
                let (format, b32) = (*format, *b32);
                self.export(&token, &*backend, format, b32)
            }
            _ => self.mutate(token, backend),
        }
    }

    fn export<B: Backend>(
        &mut self,
        token: &TokenRecord,
        backend: &B,
        format: ExportFormat,
        b32: bool,
    ) -> ActionResult<ActionOutcome> {
        let owner = Owner::of(token, backend);
        let encoded = match format {
            ExportFormat::Csv => csv_row(token, owner.user(), b32).map(|row| row + "\n"),
            ExportFormat::Yaml => TokenDocument::from_token(token, owner.user(), b32)
                .and_then(|doc| doc.to_yaml_item()),
            ExportFormat::Pskc => {
                self.write_pskc_header()?;
                match self.pskc.as_mut() {
                    Some(writer) => writer.key_package(token, owner.user()),
                    None => Ok(String::new()),
                }
            }
        };

        match encoded {
            Ok(text) => {
                self.out.write_all(text.as_bytes())?;
                Ok(ActionOutcome::ok(&token.serial, "exported"))
            }
            Err(e) if e.is_skip() => {
                writeln!(self.diag, "Skipping token {}: {}", token.serial, e)?;
                Ok(ActionOutcome::skipped(&token.serial, e))
            }
            Err(e) => {
                writeln!(self.diag, "Failed to export token {}: {}", token.serial, e)?;
                Ok(ActionOutcome::failed(&token.serial, e.to_string()))
            }
        }
    }

    fn write_pskc_header(&mut self) -> ActionResult<()> {
        if self.header_written {
            return Ok(());
        }
        let writer = self.pskc.get_or_insert_with(PskcWriter::new);
        self.out.write_all(writer.header()?.as_bytes())?;
        self.header_written = true;
        Ok(())
    }

    fn mutate<B: Backend>(&mut self, token: TokenRecord, backend: &mut B) -> ActionResult<ActionOutcome> {
        let serial = token.serial.clone();
        match apply_mutation(&self.action, token, backend) {
            Ok(applied) => {
                for line in &applied.status {
                    writeln!(self.out, "{}", line)?;
                }
                Ok(ActionOutcome::ok(serial, applied.detail))
            }
            Err(e) => {
                writeln!(self.diag, "Failed to process token {}: {}", serial, e)?;
                Ok(ActionOutcome::failed(serial, e.to_string()))
            }
        }
    }

    /// Write what was accumulated over the run and hand back the writers
    pub fn finish(mut self) -> ActionResult<(W, D)> {
        if matches!(self.action, Action::List { summary: true, .. }) {
            for line in self.summary.lines() {
                writeln!(self.out, "{}", line)?;
            }
        }

        if self.pskc.is_some() {
            self.write_pskc_header()?;
            if let Some(writer) = &self.pskc {
                self.out.write_all(writer.footer().as_bytes())?;
                write!(
                    self.diag,
                    "\n{} tokens exported.\n\n\
                     This is the AES encryption key of the token seeds.\n\
                     You need this key to import the tokens again:\n\n\t{}\n\n",
                    writer.exported(),
                    writer.key_hex()
                )?;
            }
        }

        self.out.flush()?;
        self.diag.flush()?;
        Ok((self.out, self.diag))
    }
}

/// One state change on one token, persisted before returning
fn apply_mutation<B: Backend>(action: &Action, mut token: TokenRecord, backend: &mut B) -> ActionResult<Applied> {
    let serial = token.serial.clone();
    let applied = match action {
        Action::SetRealms(realms) => {
            let mut realms = realms.clone();
            if let Some(owner) = &token.owner {
                if !realms.contains(&owner.realm) {
                    realms.push(owner.realm.clone());
                }
            }
            let line = format!("Setting realms of token {} to {}.", serial, realms.join(", "));
            token.realms = realms;
            backend.save(&token)?;
            Applied::changed("realms set", vec![line])
        }
        Action::Disable => {
            if !token.active {
                return Ok(Applied::unchanged("already disabled"));
            }
            token.active = false;
            backend.save(&token)?;
            Applied::changed("disabled", vec![format!("Disabling token {}", serial)])
        }
        Action::Delete => {
            backend.remove(&serial)?;
            Applied::changed("deleted", vec![format!("Deleting token {}", serial)])
        }
        Action::Unassign => {
            if token.owner.is_none() {
                return Ok(Applied::unchanged("not assigned"));
            }
            token.owner = None;
            token.failcount = 0;
            backend.save(&token)?;
            Applied::changed("unassigned", vec![format!("Unassigning token {}", serial)])
        }
        Action::SetDescription(description) => {
            token.description = description.clone();
            backend.save(&token)?;
            Applied::changed(
                "description set",
                vec![format!("Setting description for token {}: {}", serial, description)],
            )
        }
        Action::SetTokeninfo(pairs) => {
            let mut lines = Vec::with_capacity(pairs.len());
            for (key, value) in pairs {
                token.tokeninfo.insert(key.clone(), value.clone());
                lines.push(format!("Setting tokeninfo for token {}: {}={}", serial, key, value));
            }
            backend.save(&token)?;
            Applied::changed("tokeninfo set", lines)
        }
        Action::DeleteTokeninfo(keys) => {
            let mut lines = Vec::with_capacity(keys.len());
            for key in keys {
                token.tokeninfo.remove(key);
                lines.push(format!("Deleting tokeninfo for token {}: {}", serial, key));
            }
            backend.save(&token)?;
            Applied::changed("tokeninfo deleted", lines)
        }
        Action::List { .. } | Action::Export { .. } => {
            return Err(ActionError::invalid(action.name(), "not a mutating action"));
        }
    };
    Ok(applied)
}
