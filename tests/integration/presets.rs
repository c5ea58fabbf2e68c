//! Host presets through the umbrella API.

use logue_host::prelude::*;

use crate::helpers::*;

#[test]
fn test_snapshot_save_load_apply() {
    let dir = tempfile::tempdir().unwrap();
    let store = PresetStore::open(dir.path().join("drive")).unwrap();

    let mut host = test_host();
    host.set_param(0, 150).unwrap();
    store.save(&host.snapshot_preset("hot").unwrap()).unwrap();
    host.set_param(0, 100).unwrap();

    let preset = store.load("hot").unwrap();
    assert_eq!(preset.unit, "Drive");
    let applied = host.apply_preset(&preset).unwrap();
    assert_eq!(applied.applied, 1);
    assert!(applied.mismatch.is_none());
    assert_eq!(host.param_value(0).unwrap(), 150);
}

#[test]
fn test_preset_from_another_unit_still_applies() {
    let mut synth = UnitHost::builder()
        .build_from_module(synth_module())
        .unwrap();
    let preset = synth.snapshot_preset("tone").unwrap();

    let mut host = test_host();
    let applied = host.apply_preset(&preset).unwrap();
    assert!(applied.mismatch.is_some());
    assert_eq!(host.param_value(0).unwrap(), 50);

    assert!(synth.audit_presets().unwrap().is_none());
}
