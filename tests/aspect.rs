#![cfg(not(target_arch = "wasm32"))]

use clubfx::hero::scene::Camera;
use glam::Vec3;

fn approx_eq2(a: (f32, f32), b: (f32, f32), eps: f32) -> bool {
    (a.0 - b.0).abs() < eps && (a.1 - b.1).abs() < eps
}

/// NDC of a world point, with x rescaled by the aspect so both axes share
/// the vertical unit.
fn to_square(camera: &Camera, p: Vec3) -> (f32, f32) {
    let ndc = camera.view_proj().project_point3(p);
    (ndc.x * camera.aspect, ndc.y)
}

#[test]
fn vertical_framing_is_aspect_invariant() {
    let wide = Camera::new(75.0, 1920.0 / 1080.0, 4.0);
    let tall = Camera::new(75.0, 1080.0 / 1920.0, 4.0);

    let samples = [
        Vec3::ZERO,
        Vec3::new(0.5, 0.0, 0.0),
        Vec3::new(0.0, 0.5, 0.0),
        Vec3::new(-1.2, 0.8, 0.3),
        Vec3::new(0.8, -1.2, -0.5),
    ];
    for p in samples {
        let a = to_square(&wide, p);
        let b = to_square(&tall, p);
        assert!(approx_eq2(a, b, 1e-5), "a={a:?} b={b:?}");
    }
}

#[test]
fn origin_lands_in_the_centre() {
    let camera = Camera::new(75.0, 1.6, 4.0);
    let ndc = camera.view_proj().project_point3(Vec3::ZERO);
    assert!(ndc.x.abs() < 1e-6 && ndc.y.abs() < 1e-6);
    assert!(ndc.z > -1.0 && ndc.z < 1.0);
}

#[test]
fn the_outer_shell_fits_a_desktop_viewport_vertically() {
    // shell radius 2.3 at z = 4 with a 75 degree field of view
    let camera = Camera::new(75.0, 1280.0 / 800.0, 4.0);
    let top = camera.view_proj().project_point3(Vec3::new(0.0, 2.3, 0.0));
    assert!(top.y > 0.0 && top.y < 1.0, "{top:?}");
}
