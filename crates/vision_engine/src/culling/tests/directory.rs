//! Key slot table and target attachment

use std::rc::Rc;

use super::{origin_camera, EngineCall, RecordingEngine, TestTarget};
use crate::culling::{
    CullingError, CullingGroupProxy, CullingTargetBehaviour, GroupDirectory, GroupKey, ProxyState,
    SharedProxy, TargetRef, TransformUpdateMode,
};
use crate::foundation::math::Vec3;

fn shared(key: i32) -> SharedProxy {
    let (engine, _) = RecordingEngine::boxed();
    CullingGroupProxy::new(GroupKey::new(key), engine).into_shared()
}

#[test]
fn test_duplicate_key_keeps_original_holder() {
    let mut directory = GroupDirectory::new();
    let original = shared(2);
    let intruder = shared(2);

    directory.activate(&original).unwrap();
    let result = directory.activate(&intruder);

    assert_eq!(result, Err(CullingError::DuplicateKey { key: GroupKey::new(2) }));
    assert!(Rc::ptr_eq(&directory.get(GroupKey::new(2)).unwrap(), &original));
    assert_eq!(intruder.borrow().state(), ProxyState::Inactive);
    assert_eq!(original.borrow().state(), ProxyState::Enabled);
}

#[test]
fn test_reactivating_the_holder_is_allowed() {
    let mut directory = GroupDirectory::new();
    let proxy = shared(1);

    directory.activate(&proxy).unwrap();
    directory.activate(&proxy).unwrap();

    assert_eq!(directory.len(), 1);
}

#[test]
fn test_sentinel_keys_are_never_stored() {
    let mut directory = GroupDirectory::new();
    let proxy = shared(-1);

    directory.activate(&proxy).unwrap();

    assert!(directory.is_empty());
    assert_eq!(proxy.borrow().state(), ProxyState::Enabled);
    assert!(directory.get(GroupKey::NONE).is_none());
    assert!(directory.try_get(GroupKey::new(-5)).is_none());
}

#[test]
fn test_activation_enables_engine() {
    let (engine, calls) = RecordingEngine::boxed();
    let proxy = CullingGroupProxy::new(GroupKey::new(0), engine).into_shared();
    let mut directory = GroupDirectory::new();

    directory.activate(&proxy).unwrap();
    directory.disable(&proxy);

    let toggles: Vec<_> = calls
        .borrow()
        .iter()
        .filter(|call| matches!(call, EngineCall::Enabled(_)))
        .cloned()
        .collect();
    assert_eq!(toggles, vec![EngineCall::Enabled(true), EngineCall::Enabled(false)]);
    assert_eq!(proxy.borrow().state(), ProxyState::Disabled);
}

#[test]
fn test_disable_only_clears_own_slot() {
    let mut directory = GroupDirectory::new();
    let holder = shared(4);
    let other = shared(4);
    directory.activate(&holder).unwrap();

    directory.disable(&other);
    directory.deactivate(&other);

    assert!(Rc::ptr_eq(&directory.get(GroupKey::new(4)).unwrap(), &holder));

    directory.disable(&holder);
    assert!(directory.get(GroupKey::new(4)).is_none());

    // The key is free again once the holder let go
    directory.activate(&other).unwrap();
    assert!(Rc::ptr_eq(&directory.get(GroupKey::new(4)).unwrap(), &other));
}

#[test]
fn test_deactivate_releases_dynamic_indices() {
    let mut directory = GroupDirectory::new();
    let proxy = shared(0);
    directory.activate(&proxy).unwrap();
    let target = TestTarget::dynamic();
    proxy.borrow_mut().add(TargetRef::new(&target));
    proxy.borrow_mut().rebuild();
    assert_eq!(proxy.borrow().dynamic_target_indices(), &[0]);

    directory.deactivate(&proxy);

    assert!(proxy.borrow().dynamic_target_indices().is_empty());
    assert_eq!(proxy.borrow().state(), ProxyState::Inactive);
    assert!(directory.is_empty());
}

#[test]
fn test_rebuild_all_commits_every_group() {
    let mut directory = GroupDirectory::new();
    let first = shared(0);
    let second = shared(1);
    let idle = shared(2);
    for proxy in [&first, &second, &idle] {
        directory.activate(proxy).unwrap();
    }
    let a = TestTarget::fixed();
    let b = TestTarget::fixed();
    first.borrow_mut().add(TargetRef::new(&a));
    second.borrow_mut().add(TargetRef::new(&b));

    assert_eq!(directory.rebuild_all(), 2);
    assert_eq!(first.borrow().targets().len(), 1);
    assert_eq!(second.borrow().targets().len(), 1);
    assert_eq!(directory.rebuild_all(), 0);
}

#[test]
fn test_link_target_camera() {
    let mut directory = GroupDirectory::new();
    let proxy = shared(0);
    directory.activate(&proxy).unwrap();

    assert!(directory.link_target_camera(GroupKey::new(0), origin_camera()));
    assert!(!directory.link_target_camera(GroupKey::new(9), origin_camera()));
    assert_eq!(proxy.borrow().target_camera(), Some(origin_camera()));
}

#[test]
fn test_behaviour_follows_its_group_key() {
    let mut directory = GroupDirectory::new();
    let main = shared(0);
    let props = shared(1);
    directory.activate(&main).unwrap();
    directory.activate(&props).unwrap();

    let target = CullingTargetBehaviour::new(GroupKey::new(0), TransformUpdateMode::Dynamic, Vec3::zeros());
    assert!(target.enable(&directory));
    directory.rebuild_all();
    assert_eq!(main.borrow().index_of(&target.target_ref()), Some(0));

    target.set_group_key(GroupKey::new(1), &directory);
    directory.rebuild_all();
    assert_eq!(main.borrow().index_of(&target.target_ref()), None);
    assert_eq!(props.borrow().index_of(&target.target_ref()), Some(0));
    assert!(Rc::ptr_eq(&target.group().unwrap(), &props));

    target.disable();
    directory.rebuild_all();
    assert!(props.borrow().targets().is_empty());
    assert!(target.group().is_none());
}

#[test]
fn test_dropped_behaviour_stages_its_removal() {
    let mut directory = GroupDirectory::new();
    let proxy = shared(0);
    directory.activate(&proxy).unwrap();
    let target = CullingTargetBehaviour::new(GroupKey::new(0), TransformUpdateMode::Static, Vec3::zeros());
    target.enable(&directory);
    proxy.borrow_mut().rebuild();
    assert_eq!(proxy.borrow().targets().len(), 1);

    drop(target);

    assert!(proxy.borrow().has_pending_changes());
    proxy.borrow_mut().rebuild();
    assert!(proxy.borrow().targets().is_empty());
}

#[test]
fn test_reactivation_restores_dynamic_refresh() {
    let mut directory = GroupDirectory::new();
    let proxy = shared(0);
    directory.activate(&proxy).unwrap();
    let target = TestTarget::dynamic();
    proxy.borrow_mut().add(TargetRef::new(&target));
    proxy.borrow_mut().rebuild();

    directory.deactivate(&proxy);
    directory.activate(&proxy).unwrap();
    proxy.borrow_mut().update();
    assert_eq!(proxy.borrow().dynamic_target_indices(), &[0]);

    target.move_to(Vec3::new(50.0, 0.0, 0.0));
    proxy.borrow_mut().update();
    assert_eq!(proxy.borrow().bounding_spheres()[0].position, Vec3::new(50.0, 0.0, 0.0));
}

#[test]
fn test_behaviour_dropped_during_borrow_is_pruned_later() {
    let mut directory = GroupDirectory::new();
    let proxy = shared(0);
    directory.activate(&proxy).unwrap();
    let doomed = CullingTargetBehaviour::new(GroupKey::new(0), TransformUpdateMode::Static, Vec3::zeros());
    doomed.enable(&directory);
    proxy.borrow_mut().rebuild();
    let handle = doomed.target_ref();

    {
        let _busy = proxy.borrow();
        drop(doomed);
    }
    assert!(!proxy.borrow().has_pending_changes());
    assert_eq!(proxy.borrow().index_of(&handle), Some(0));

    let newcomer = TestTarget::fixed();
    proxy.borrow_mut().add(TargetRef::new(&newcomer));
    proxy.borrow_mut().rebuild();

    assert_eq!(proxy.borrow().index_of(&handle), None);
    assert_eq!(proxy.borrow().targets().len(), 1);
}
