//! Host-side presets and the unit-internal preset audit.
//!
//! A host preset is a snapshot of parameter values stored as one JSON file per
//! preset. It is independent from the presets a unit ships with, which are
//! only reachable through `unit_load_preset` and friends; [`PresetAudit`]
//! exercises those.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use logue_abi::{UnitDescriptor, MAX_PARAMS};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{LifecycleError, PresetError};
use crate::module::Capability;
use crate::session::Session;
use crate::Result;

pub const MAX_PRESET_NAME_LEN: usize = 63;

const PRESET_EXTENSION: &str = "json";

/// Parameter values captured from a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    /// Name of the unit the preset was captured from.
    pub unit: String,
    pub dev_id: u32,
    pub unit_id: u32,
    pub num_params: u32,
    pub params: Vec<i32>,
}

impl Preset {
    pub fn new(
        name: &str,
        descriptor: &UnitDescriptor,
        params: Vec<i32>,
    ) -> std::result::Result<Self, PresetError> {
        validate_name(name)?;
        if params.len() > MAX_PARAMS {
            return Err(PresetError::TooManyParams(params.len()));
        }
        Ok(Self {
            name: name.to_string(),
            unit: descriptor.name.clone(),
            dev_id: descriptor.dev_id,
            unit_id: descriptor.unit_id,
            num_params: params.len() as u32,
            params,
        })
    }

    fn check(&self) -> std::result::Result<(), PresetError> {
        validate_name(&self.name)?;
        if self.params.len() > MAX_PARAMS {
            return Err(PresetError::TooManyParams(self.params.len()));
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> std::result::Result<(), PresetError> {
    if name.is_empty() {
        return Err(PresetError::EmptyName);
    }
    let len = name.chars().count();
    if len > MAX_PRESET_NAME_LEN {
        return Err(PresetError::NameTooLong(len));
    }
    if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(PresetError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// A preset captured from a different unit than the one it is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityMismatch {
    pub preset_dev_id: u32,
    pub preset_unit_id: u32,
    pub unit_dev_id: u32,
    pub unit_unit_id: u32,
}

impl IdentityMismatch {
    pub fn check(preset: &Preset, descriptor: &UnitDescriptor) -> Option<Self> {
        if preset.dev_id == descriptor.dev_id && preset.unit_id == descriptor.unit_id {
            None
        } else {
            Some(Self {
                preset_dev_id: preset.dev_id,
                preset_unit_id: preset.unit_id,
                unit_dev_id: descriptor.dev_id,
                unit_unit_id: descriptor.unit_id,
            })
        }
    }
}

impl fmt::Display for IdentityMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "preset belongs to {:#010x}/{:#010x}, unit is {:#010x}/{:#010x}",
            self.preset_dev_id, self.preset_unit_id, self.unit_dev_id, self.unit_unit_id
        )
    }
}

/// What [`Session::apply_preset`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetApplication {
    pub applied: usize,
    pub mismatch: Option<IdentityMismatch>,
}

/// A directory of `<name>.json` presets.
#[derive(Debug, Clone)]
pub struct PresetStore {
    dir: PathBuf,
}

impl PresetStore {
    /// Opens `dir`, creating it if needed.
    pub fn open(dir: impl AsRef<Path>) -> std::result::Result<Self, PresetError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> std::result::Result<PathBuf, PresetError> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{name}.{PRESET_EXTENSION}")))
    }

    /// Names of the stored presets, sorted.
    pub fn scan(&self) -> std::result::Result<Vec<String>, PresetError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(PRESET_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Writes `preset`, replacing any preset of the same name.
    pub fn save(&self, preset: &Preset) -> std::result::Result<PathBuf, PresetError> {
        preset.check()?;
        let path = self.path_for(&preset.name)?;
        fs::write(&path, serde_json::to_string_pretty(preset)?)?;
        debug!(path = %path.display(), "preset saved");
        Ok(path)
    }

    pub fn load(&self, name: &str) -> std::result::Result<Preset, PresetError> {
        let path = self.path_for(name)?;
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PresetError::NotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let preset: Preset = serde_json::from_str(&text)?;
        preset.check()?;
        Ok(preset)
    }

    pub fn delete(&self, name: &str) -> std::result::Result<(), PresetError> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(PresetError::NotFound(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}

/// Outcome of loading one unit-internal preset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetCheck {
    pub index: u8,
    pub name: Option<String>,
    pub reported_index: Option<u8>,
    pub name_after_load: Option<String>,
}

impl PresetCheck {
    pub fn index_matches(&self) -> bool {
        self.reported_index == Some(self.index)
    }

    pub fn name_stable(&self) -> bool {
        match (&self.name, &self.name_after_load) {
            (_, None) => false,
            (_, Some(after)) if after.is_empty() => false,
            (Some(before), Some(after)) => before == after,
            (None, Some(_)) => true,
        }
    }

    pub fn passed(&self) -> bool {
        self.index_matches() && self.name_stable()
    }
}

/// A rapid-switch step where the unit reported the wrong index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchFailure {
    pub cycle: u32,
    pub preset: u8,
    pub reported: Option<u8>,
}

/// Preset index observed around `unit_reset`. Some units legitimately return
/// to preset 0 on reset, so this is recorded and never judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetObservation {
    pub before: Option<u8>,
    pub after: Option<u8>,
}

impl ResetObservation {
    pub fn preserved(&self) -> bool {
        self.before == self.after
    }
}

pub const SWITCH_CYCLES: u32 = 3;

/// Exercises a unit's own preset entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetAudit {
    pub checks: Vec<PresetCheck>,
    pub switch_failures: Vec<SwitchFailure>,
    pub reset: Option<ResetObservation>,
}

impl PresetAudit {
    /// Loads every preset, checks the reported index and name, switches
    /// through all of them [`SWITCH_CYCLES`] times, then records what reset
    /// does to the current index.
    ///
    /// Returns `None` when the unit declares no presets or lacks any of the
    /// load / index / name entry points.
    pub fn run(session: &mut Session) -> Result<Option<Self>> {
        let Some(descriptor) = session.descriptor() else {
            return Err(LifecycleError::NotRunning {
                operation: "preset audit",
                state: session.state(),
            }
            .into());
        };
        let count = descriptor.num_presets.min(u8::MAX as u32 + 1) as usize;
        let complete = [
            Capability::LoadPreset,
            Capability::PresetIndex,
            Capability::PresetName,
        ]
        .into_iter()
        .all(|cap| session.supports(cap));
        if count == 0 || !complete {
            debug!(count, complete, "preset audit skipped");
            return Ok(None);
        }

        let unit = session.instance_mut();
        let mut checks = Vec::with_capacity(count);
        for index in (0..count).map(|i| i as u8) {
            let name = unit.preset_name(index)?;
            unit.load_preset(index)?;
            let reported_index = unit.preset_index()?;
            let name_after_load = unit.preset_name(index)?;
            let check = PresetCheck {
                index,
                name,
                reported_index,
                name_after_load,
            };
            if !check.passed() {
                warn!(?check, "preset check failed");
            }
            checks.push(check);
        }

        let mut switch_failures = Vec::new();
        for cycle in 0..SWITCH_CYCLES {
            for preset in (0..count).map(|i| i as u8) {
                unit.load_preset(preset)?;
                let reported = unit.preset_index()?;
                if reported != Some(preset) {
                    switch_failures.push(SwitchFailure {
                        cycle,
                        preset,
                        reported,
                    });
                }
            }
        }

        unit.load_preset(0)?;
        let before = unit.preset_index()?;
        unit.reset()?;
        let after = unit.preset_index()?;
        let reset = ResetObservation { before, after };
        if !reset.preserved() {
            warn!(?before, ?after, "reset changed the preset index");
        }

        let audit = Self {
            checks,
            switch_failures,
            reset: Some(reset),
        };
        info!(presets = count, passed = audit.passed(), "preset audit finished");
        Ok(Some(audit))
    }

    /// Index and name checks plus rapid switching. The reset observation is
    /// informational and does not count.
    pub fn passed(&self) -> bool {
        self.checks.iter().all(PresetCheck::passed) && self.switch_failures.is_empty()
    }
}

fn show_index(index: Option<u8>) -> String {
    index.map_or_else(|| "-".to_string(), |i| i.to_string())
}

impl fmt::Display for PresetAudit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Preset audit ({} presets)", self.checks.len())?;
        for check in &self.checks {
            writeln!(
                f,
                "  [{:3}] {:<16} index {:>3}  {}",
                check.index,
                check.name.as_deref().unwrap_or("<null>"),
                show_index(check.reported_index),
                if check.passed() { "ok" } else { "FAIL" }
            )?;
        }
        if self.switch_failures.is_empty() {
            writeln!(f, "  rapid switching: ok ({SWITCH_CYCLES} cycles)")?;
        } else {
            for fail in &self.switch_failures {
                writeln!(
                    f,
                    "  rapid switching: cycle {} preset {} reported {}",
                    fail.cycle,
                    fail.preset,
                    show_index(fail.reported)
                )?;
            }
        }
        if let Some(reset) = &self.reset {
            writeln!(
                f,
                "  reset: index {} -> {}{}",
                show_index(reset.before),
                show_index(reset.after),
                if reset.preserved() { "" } else { " (changed)" }
            )?;
        }
        write!(f, "Result: {}", if self.passed() { "PASSED" } else { "FAILED" })
    }
}
