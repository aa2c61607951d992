// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
use core::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};
use meshlink_transform::{
    build_homogeneous_transform, deg_to_rad, euler_to_dcm, euler_to_dcm4, euler_to_quaternion,
    is_normal, quaternion_to_rotation_matrix, rad_to_deg, EulerAngles, Mat3, Mat4, Quat, Rotation,
    TransformError,
};

const TOL: f64 = 1e-9;

fn assert_mat3_close(a: &Mat3, b: &Mat3) {
    let diff = a.max_abs_diff(b);
    assert!(diff <= TOL, "{a:?} vs {b:?}, diff={diff}");
}

#[test]
fn zero_angles_give_identity_dcm() {
    assert_mat3_close(&euler_to_dcm(0.0, 0.0, 0.0), &Mat3::identity());
}

#[test]
fn quarter_roll_dcm_matches_known_values() {
    let dcm = euler_to_dcm(FRAC_PI_2, 0.0, 0.0);
    let expected = Mat3::new([
        1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, //
        0.0, -1.0, 0.0, //
    ]);
    assert_mat3_close(&dcm, &expected);
}

#[test]
fn dcm_and_quaternion_paths_agree() {
    let samples = [
        [FRAC_PI_2, 0.0, 0.0],
        [0.0, FRAC_PI_2 * 0.5, 0.0],
        [0.0, 0.0, FRAC_PI_2],
        [0.3, -0.7, 1.9],
        [-PI * 0.9, 0.1, FRAC_PI_4],
    ];
    for [roll, pitch, yaw] in samples {
        let dcm = euler_to_dcm(roll, pitch, yaw);
        let q = euler_to_quaternion(roll, pitch, yaw);
        assert!(is_normal(&q), "euler quaternion must be unit-norm: {q:?}");
        let from_q = quaternion_to_rotation_matrix(&q).expect("normal quaternion");
        assert_mat3_close(&dcm, &from_q);
    }
}

#[test]
fn yaw_only_quaternion_has_expected_components() {
    let q = euler_to_quaternion(0.0, 0.0, PI);
    let [x, y, z, w] = q.to_array();
    assert!(x.abs() < TOL && y.abs() < TOL && w.abs() < TOL);
    assert!((z - 1.0).abs() < TOL);
}

#[test]
fn dcm_is_orthonormal() {
    let dcm = euler_to_dcm(0.4, -1.1, 2.5);
    assert_mat3_close(&dcm.multiply(&dcm.transpose()), &Mat3::identity());
}

#[test]
fn dcm4_embeds_rotation_with_identity_border() {
    let m = euler_to_dcm4(0.2, 0.3, 0.4);
    assert_mat3_close(&m.rotation(), &euler_to_dcm(0.2, 0.3, 0.4));
    assert_eq!(m.translation_part(), [0.0, 0.0, 0.0]);
    assert_eq!([m.at(3, 0), m.at(3, 1), m.at(3, 2), m.at(3, 3)], [0.0, 0.0, 0.0, 1.0]);
}

#[test]
fn is_normal_respects_tolerance() {
    assert!(is_normal(&Quat::identity()));
    assert!(is_normal(&Quat::new(0.0, 0.0, 0.0, 1.0 + 5e-10)));
    assert!(!is_normal(&Quat::new(0.0, 0.0, 0.0, 1.0 + 2e-9)));
    assert!(!is_normal(&Quat::new(1.0, 1.0, 0.0, 0.0)));
}

#[test]
fn unnormalized_slice_is_rejected() {
    let err = Quat::from_slice(&[0.0, 0.0, 0.5, 0.5]).expect_err("not unit norm");
    assert!(matches!(err, TransformError::NotNormalized { .. }));
    let err = Quat::from_slice(&[0.0, 0.0, 1.0]).expect_err("wrong length");
    assert!(matches!(err, TransformError::InvalidLength { got: 3, .. }));
}

#[test]
fn rotation_matrix_requires_unit_quaternion() {
    let q = Quat::new(0.0, 0.0, 2.0, 0.0);
    assert!(quaternion_to_rotation_matrix(&q).is_err());
}

#[test]
fn homogeneous_transform_defaults_to_identity() {
    let m = build_homogeneous_transform(None, None, None).unwrap();
    assert_eq!(m, Mat4::identity());
}

#[test]
fn homogeneous_transform_places_translation_in_last_column() {
    let rot = Rotation::Euler(EulerAngles::new(0.0, 0.0, FRAC_PI_2));
    let m = build_homogeneous_transform(Some([1.0, 2.0, 3.0]), Some(rot), None).unwrap();
    assert_eq!(m.translation_part(), [1.0, 2.0, 3.0]);
    assert_mat3_close(&m.rotation(), &euler_to_dcm(0.0, 0.0, FRAC_PI_2));
    assert_eq!(m.at(3, 3), 1.0);
}

#[test]
fn euler_and_quaternion_rotations_build_same_transform() {
    let e = EulerAngles::new(0.1, 0.2, 0.3);
    let from_euler = build_homogeneous_transform(None, Some(Rotation::Euler(e)), None).unwrap();
    let q = Quat::from_euler(e);
    let from_quat =
        build_homogeneous_transform(None, Some(Rotation::Quaternion(q)), None).unwrap();
    assert_mat3_close(&from_euler.rotation(), &from_quat.rotation());
}

#[test]
fn scale_multiplies_rotation_columns() {
    let m = build_homogeneous_transform(None, None, Some([2.0, 3.0, 4.0])).unwrap();
    assert_eq!(m, Mat4::scale(2.0, 3.0, 4.0));
    let rot = Rotation::Euler(EulerAngles::new(0.0, 0.0, FRAC_PI_2));
    let m = build_homogeneous_transform(Some([1.0, 2.0, 3.0]), Some(rot), Some([2.0, 3.0, 4.0]))
        .unwrap();
    let dcm = euler_to_dcm(0.0, 0.0, FRAC_PI_2);
    for row in 0..3 {
        for (col, s) in [2.0, 3.0, 4.0].into_iter().enumerate() {
            assert!((m.at(row, col) - dcm.at(row, col) * s).abs() < TOL);
        }
    }
    assert_eq!(m.translation_part(), [1.0, 2.0, 3.0]);
    let err = build_homogeneous_transform(None, None, Some([1.0, 0.0, 1.0])).unwrap_err();
    assert_eq!(err, TransformError::InvalidScale { axis: 1, value: 0.0 });
}

#[test]
fn rotation_slice_dispatches_on_length() {
    assert!(matches!(
        Rotation::from_slice(&[0.0, 0.0, 1.0]),
        Ok(Rotation::Euler(_))
    ));
    assert!(matches!(
        Rotation::from_slice(&[0.0, 0.0, 0.0, 1.0]),
        Ok(Rotation::Quaternion(_))
    ));
    let err = Rotation::from_slice(&[0.0, 1.0]).unwrap_err();
    assert_eq!(err, TransformError::InvalidRotationLength { got: 2 });
    assert!(err.to_string().contains("3 (euler) or 4 (quaternion)"));
}

#[test]
fn degenerate_matrix_detection() {
    assert!(Mat4::new([0.0; 16]).is_degenerate());
    assert!(!Mat4::identity().is_degenerate());
    assert!(Mat4::from_slice(&[0.0; 15]).is_err());
}

#[test]
fn degree_conversions_invert() {
    assert!((deg_to_rad(180.0) - PI).abs() < TOL);
    assert!((rad_to_deg(FRAC_PI_2) - 90.0).abs() < TOL);
    assert!((rad_to_deg(deg_to_rad(-37.5)) + 37.5).abs() < TOL);
}
