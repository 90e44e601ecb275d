// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Planes and view frustums.

use super::Vec3;
use serde::{Deserialize, Serialize};

/// A plane in Hessian normal form: points `p` with `normal · p + d = 0`.
///
/// The positive half-space (`signed_distance > 0`) is the "inside".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    /// The unit normal, pointing to the inside.
    pub normal: Vec3,
    /// The offset along the normal.
    pub d: f32,
}

impl Plane {
    /// Creates a plane through `point` whose inside lies along `normal`.
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize();
        Self {
            normal,
            d: -normal.dot(point),
        }
    }

    /// Signed distance from `point` to the plane; positive on the inside.
    #[inline]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }
}

/// A convex view volume bounded by six inward-facing planes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far.
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Builds a perspective frustum for a viewer at `eye` looking along
    /// `forward`, with a vertical field of view `fov_y` (radians).
    pub fn perspective(
        eye: Vec3,
        forward: Vec3,
        up: Vec3,
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let f = forward.normalize();
        let r = f.cross(up).normalize();
        let u = r.cross(f);

        let half_v = fov_y * 0.5;
        let half_h = (half_v.tan() * aspect).atan();
        let (sin_h, cos_h) = half_h.sin_cos();
        let (sin_v, cos_v) = half_v.sin_cos();

        let left = Plane::from_point_normal(eye, r * cos_h + f * sin_h);
        let right = Plane::from_point_normal(eye, -r * cos_h + f * sin_h);
        let bottom = Plane::from_point_normal(eye, u * cos_v + f * sin_v);
        let top = Plane::from_point_normal(eye, -u * cos_v + f * sin_v);
        let near_plane = Plane::from_point_normal(eye + f * near, f);
        let far_plane = Plane::from_point_normal(eye + f * far, -f);

        Self {
            planes: [left, right, bottom, top, near_plane, far_plane],
        }
    }

    /// Returns `true` if `point` lies inside or on every plane.
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.signed_distance(point) >= 0.0)
    }
}
