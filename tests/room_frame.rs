use roomscan_kernel::math::{rotate_by_quaternion, Vector3};
use roomscan_kernel::room::labels::{infer_room_size, LabeledMeasure};
use roomscan_kernel::room::{measure, solve_room_frame, to_local, validate, PickStep, PickedPoints, RejectReason};
use roomscan_kernel::tracker::SpeakerRegistry;
use roomscan_kernel::Quaternion;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

/// A 3.6 x 4.2 x 2.4 m room rotated 30° about +Y and offset from the origin.
fn rotated_room() -> (PickedPoints, Quaternion) {
    let q = Quaternion::from_axis_angle(Vector3::new(0.0, 1.0, 0.0), 30f32.to_radians());
    let offset = Vector3::new(2.0, 0.0, -1.0);
    let place = |x: f32, y: f32, z: f32| offset + rotate_by_quaternion(q, Vector3::new(x, y, z));
    let picks = PickedPoints {
        x_min: Some(place(-1.8, 1.1, 0.3)),
        x_max: Some(place(1.8, 1.1, 0.3)),
        z_min: Some(place(0.4, 0.9, -2.1)),
        z_max: Some(place(-0.1, 0.9, 2.1)),
        y_floor: Some(place(0.2, 0.0, 0.5)),
        y_ceil: Some(place(-0.3, 2.4, 0.1)),
    };
    (picks, q)
}

#[test]
fn rotated_room_recovers_dimensions() {
    let (picks, q) = rotated_room();
    let (frame, extent) = solve_room_frame(&picks).expect("complete picks");

    // Z and Y picks are off-axis; only the component along each axis counts.
    assert!(approx(extent.width, 3.6), "width {}", extent.width);
    assert!(approx(extent.depth, 4.2), "depth {}", extent.depth);
    assert!(approx(extent.height, 2.4), "height {}", extent.height);

    let expected_vx = rotate_by_quaternion(q, Vector3::new(1.0, 0.0, 0.0));
    let expected_vz = rotate_by_quaternion(q, Vector3::new(0.0, 0.0, 1.0));
    assert!(approx(frame.vx.dot(expected_vx), 1.0));
    assert!(approx(frame.vz.dot(expected_vz), 1.0));

    for (a, b) in [(frame.vx, frame.vy), (frame.vx, frame.vz), (frame.vy, frame.vz)] {
        assert!(a.dot(b).abs() < 1e-5);
    }
    assert!(validate(&frame, &extent).ok);
}

#[test]
fn origin_is_mean_of_pair_midpoints() {
    let (picks, _) = rotated_room();
    let m = measure(&picks).expect("complete picks");
    let mid = |a: Option<Vector3>, b: Option<Vector3>| a.unwrap().midpoint(b.unwrap());
    let cx = mid(picks.x_min, picks.x_max);
    let cz = mid(picks.z_min, picks.z_max);
    let cy = mid(picks.y_floor, picks.y_ceil);
    let expected = (cx + cz + cy) * (1.0 / 3.0);
    assert!((m.frame.origin - expected).length() < 1e-5);
}

#[test]
fn parallel_wall_picks_fail_validation() {
    // Z picks along the same direction as the X picks
    let picks = PickedPoints {
        x_min: Some(Vector3::new(0.0, 1.0, 0.0)),
        x_max: Some(Vector3::new(3.0, 1.0, 0.0)),
        z_min: Some(Vector3::new(0.0, 1.0, 0.0)),
        z_max: Some(Vector3::new(4.0, 1.0, 0.0)),
        y_floor: Some(Vector3::new(1.0, 0.0, 0.0)),
        y_ceil: Some(Vector3::new(1.0, 2.5, 0.0)),
    };
    let (frame, extent) = solve_room_frame(&picks).expect("complete picks");
    let v = validate(&frame, &extent);
    assert!(!v.ok);
    assert_eq!(v.reason, Some(RejectReason::DepthTooShort));
}

#[test]
fn small_room_reports_first_failing_dimension() {
    let picks = PickedPoints {
        x_min: Some(Vector3::new(0.0, 1.0, 0.0)),
        x_max: Some(Vector3::new(0.3, 1.0, 0.0)),
        z_min: Some(Vector3::new(0.0, 1.0, 0.0)),
        z_max: Some(Vector3::new(0.0, 1.0, 0.3)),
        y_floor: Some(Vector3::new(0.0, 0.0, 0.0)),
        y_ceil: Some(Vector3::new(0.0, 0.1, 0.0)),
    };
    let (frame, extent) = solve_room_frame(&picks).expect("complete picks");
    let v = validate(&frame, &extent);
    assert_eq!(v.reason, Some(RejectReason::WidthTooShort));
    assert_eq!(v.reason.map(RejectReason::code), Some("width_too_short"));
}

#[test]
fn speakers_reported_in_room_coordinates() {
    let (picks, _) = rotated_room();
    let (frame, _) = solve_room_frame(&picks).expect("complete picks");

    let world = frame.origin + frame.vx * 1.0 + frame.vz * -0.5 + frame.vy * 0.25;
    let mut reg = SpeakerRegistry::new();
    reg.upsert(1, world, 0);
    let local = reg.local_positions(&frame);
    assert_eq!(local.len(), 1);
    let [x, y, z] = local[0].1;
    assert!(approx(x, 1.0) && approx(y, 0.25) && approx(z, -0.5));
    assert_eq!(to_local(&frame, frame.origin), [0.0, 0.0, 0.0]);
}

#[test]
fn picking_flow_reaches_review() {
    let mut picks = PickedPoints::default();
    let (full, _) = rotated_room();
    while picks.next_step() != PickStep::Review {
        let step = picks.next_step();
        assert!(solve_room_frame(&picks).is_none());
        assert!(picks.set(step, full.get(step).expect("fixture point")));
    }
    assert_eq!(picks, full);
}

#[test]
fn labelled_measures_give_room_size() {
    let measures = vec![
        LabeledMeasure::new("가로", 3.6),
        LabeledMeasure::new("방 깊이", 4.2),
        LabeledMeasure::new("Height (m)", 2.4),
    ];
    let size = infer_room_size(&measures).expect("all three present");
    assert_eq!((size.width, size.depth, size.height), (3.6, 4.2, 2.4));
}
