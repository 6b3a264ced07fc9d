//! End-to-end flows with the stock target and the reference engine

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use approx::assert_relative_eq;

use super::origin_camera;
use crate::culling::{
    Camera, CullingGroupProxy, CullingTarget, CullingTargetBehaviour, GroupDirectory, GroupKey,
    SharedProxy, SimpleVisibilityEngine, TransformUpdateMode,
};
use crate::foundation::logging;
use crate::foundation::math::Vec3;

const MAIN: GroupKey = GroupKey::new(0);

fn banded_group(directory: &mut GroupDirectory) -> SharedProxy {
    let mut proxy = CullingGroupProxy::new(MAIN, Box::new(SimpleVisibilityEngine::new()));
    proxy.set_bounding_distances(vec![5.0, 10.0]);
    proxy.set_target_camera(Some(origin_camera()));
    directory.activate_new(proxy).unwrap()
}

fn spawn(directory: &GroupDirectory, position: Vec3, radius: f32) -> Rc<CullingTargetBehaviour> {
    let target = CullingTargetBehaviour::new(MAIN, TransformUpdateMode::Dynamic, position);
    target.set_radius(radius);
    assert!(target.enable(directory));
    target
}

#[test]
fn test_three_targets_land_in_their_bands() {
    logging::init_for_tests();
    let mut directory = GroupDirectory::new();
    let proxy = banded_group(&mut directory);

    let targets = [
        spawn(&directory, Vec3::new(0.0, 0.0, 0.0), 1.0),
        spawn(&directory, Vec3::new(5.0, 0.0, 0.0), 2.0),
        spawn(&directory, Vec3::new(10.0, 0.0, 0.0), 3.0),
    ];
    assert!(proxy.borrow_mut().rebuild());

    let bands: Vec<_> = targets.iter().map(|target| target.distance_band()).collect();
    assert_eq!(bands, vec![Some(0), Some(1), Some(2)]);
    assert!(targets.iter().all(|target| target.is_visible()));

    let proxy = proxy.borrow();
    assert_eq!(proxy.targets().len(), 3);
    assert_eq!(proxy.bounding_spheres().len(), 16);
    for target in &targets {
        let index = proxy.index_of(&target.target_ref()).unwrap();
        assert_relative_eq!(proxy.bounding_spheres()[index].radius, target.radius());
    }
}

#[test]
fn test_state_changes_reach_target_and_group_listeners() {
    logging::init_for_tests();
    let mut directory = GroupDirectory::new();
    let proxy = banded_group(&mut directory);
    let near = spawn(&directory, Vec3::new(1.0, 0.0, 0.0), 1.0);
    let far = spawn(&directory, Vec3::new(0.0, 0.0, 12.0), 1.0);

    let near_events = Rc::new(RefCell::new(Vec::new()));
    {
        let near_events = near_events.clone();
        near.state_changed()
            .subscribe(move |event| near_events.borrow_mut().push(*event));
    }
    let group_events = Rc::new(RefCell::new(0));
    {
        let group_events = group_events.clone();
        proxy
            .borrow()
            .on_state_changed()
            .subscribe(move |_| *group_events.borrow_mut() += 1);
    }

    proxy.borrow_mut().update();
    assert_eq!(CullingGroupProxy::dispatch_state_changes(&proxy), 2);

    assert_eq!(*group_events.borrow(), 2);
    let near_events = near_events.borrow();
    assert_eq!(near_events.len(), 1);
    assert!(near_events[0].has_become_visible());
    assert_eq!(near_events[0].current_band, 0);
    assert_eq!(far.distance_band(), Some(2));

    assert_eq!(CullingGroupProxy::dispatch_state_changes(&proxy), 0);
}

#[test]
fn test_new_occupant_of_an_index_is_reported() {
    let mut directory = GroupDirectory::new();
    let proxy = banded_group(&mut directory);

    let first = spawn(&directory, Vec3::new(6.0, 0.0, 0.0), 1.0);
    proxy.borrow_mut().update();
    CullingGroupProxy::dispatch_state_changes(&proxy);

    // Same placement, so the same state at the same index
    let second = spawn(&directory, Vec3::new(6.0, 0.0, 0.0), 1.0);
    first.disable();
    let fired = Rc::new(RefCell::new(0));
    {
        let fired = fired.clone();
        second
            .state_changed()
            .subscribe(move |_| *fired.borrow_mut() += 1);
    }

    proxy.borrow_mut().update();
    assert_eq!(proxy.borrow().index_of(&second.target_ref()), Some(0));
    CullingGroupProxy::dispatch_state_changes(&proxy);

    assert_eq!(*fired.borrow(), 1);
}

#[test]
fn test_listener_may_query_its_group() {
    let mut directory = GroupDirectory::new();
    let proxy = banded_group(&mut directory);
    let target = spawn(&directory, Vec3::new(3.0, 0.0, 0.0), 1.0);

    let observed = Rc::new(RefCell::new(None));
    {
        let observed = observed.clone();
        let weak: Weak<CullingTargetBehaviour> = Rc::downgrade(&target);
        target.state_changed().subscribe(move |_| {
            if let Some(target) = weak.upgrade() {
                *observed.borrow_mut() = Some((target.is_visible(), target.distance_band()));
            }
        });
    }

    proxy.borrow_mut().update();
    CullingGroupProxy::dispatch_state_changes(&proxy);

    assert_eq!(*observed.borrow(), Some((true, Some(0))));
}

#[test]
fn test_moving_camera_changes_bands() {
    let mut directory = GroupDirectory::new();
    let proxy = banded_group(&mut directory);
    let target = spawn(&directory, Vec3::new(0.0, 0.0, 0.0), 1.0);
    proxy.borrow_mut().update();
    CullingGroupProxy::dispatch_state_changes(&proxy);

    assert!(directory.link_target_camera(MAIN, Camera::new(Vec3::new(0.0, 0.0, 7.0), 1000.0)));
    let events = Rc::new(RefCell::new(Vec::new()));
    {
        let events = events.clone();
        proxy
            .borrow()
            .on_state_changed()
            .subscribe(move |event| events.borrow_mut().push(*event));
    }
    proxy.borrow_mut().update();
    CullingGroupProxy::dispatch_state_changes(&proxy);

    let events = events.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!((events[0].previous_band, events[0].current_band), (0, 1));
    assert!(events[0].is_visible && events[0].was_visible);
    assert_eq!(target.distance_band(), Some(1));
}

#[test]
fn test_moving_target_is_tracked_by_update() {
    let mut directory = GroupDirectory::new();
    let proxy = banded_group(&mut directory);
    let target = spawn(&directory, Vec3::new(0.0, 0.0, 0.0), 1.0);
    proxy.borrow_mut().update();
    assert_eq!(target.distance_band(), Some(0));

    target.set_position(Vec3::new(11.0, 0.0, 0.0));
    proxy.borrow_mut().update();
    assert_eq!(target.distance_band(), Some(2));

    // Static targets keep their committed sphere until a refresh
    target.set_update_mode(TransformUpdateMode::Static);
    target.set_position(Vec3::new(0.0, 0.0, 0.0));
    proxy.borrow_mut().update();
    assert_eq!(target.distance_band(), Some(2));

    proxy.borrow_mut().refresh_all_geometry();
    assert_eq!(target.distance_band(), Some(0));
}
