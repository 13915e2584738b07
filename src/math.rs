//! 仿射变换工具
//!
//! glam 为列向量约定：`a * b` 先作用 b 再作用 a。
//! Rapier 侧使用 nalgebra 的 Isometry / Point，这里负责双向转换。

use glam::{Mat4, Quat, Vec3, Vec4};
use nalgebra::{Isometry3, Point3, Quaternion, Translation3, UnitQuaternion};

/// 去掉平移，只保留旋转（及缩放）部分
#[inline]
pub fn strip_translation(m: Mat4) -> Mat4 {
    let mut out = m;
    out.w_axis = Vec4::W;
    out
}

/// 将 `from` 方向旋转到 `to` 方向的矩阵
///
/// 任一向量长度小于 `min_length` 时返回 None（退化方向）。
/// 反向平行时 glam 会自动选择一个垂直轴旋转 180°。
pub fn rotate_between(from: Vec3, to: Vec3, min_length: f32) -> Option<Mat4> {
    let min_sq = min_length * min_length;
    if from.length_squared() < min_sq || to.length_squared() < min_sq {
        return None;
    }
    let rotation = Quat::from_rotation_arc(from.normalize(), to.normalize());
    Some(Mat4::from_quat(rotation))
}

/// 将 glam Mat4 转换为 Rapier Isometry（丢弃缩放）
pub fn mat4_to_isometry(mat: Mat4) -> Isometry3<f32> {
    let (_, rotation, translation) = mat.to_scale_rotation_translation();
    Isometry3::from_parts(
        Translation3::new(translation.x, translation.y, translation.z),
        UnitQuaternion::from_quaternion(Quaternion::new(rotation.w, rotation.x, rotation.y, rotation.z)),
    )
}

/// 将 Rapier Isometry 转换为 glam Mat4
pub fn isometry_to_mat4(iso: &Isometry3<f32>) -> Mat4 {
    let translation = Vec3::new(
        iso.translation.vector.x,
        iso.translation.vector.y,
        iso.translation.vector.z,
    );
    let q = iso.rotation.quaternion();
    let rotation = Quat::from_xyzw(q.i, q.j, q.k, q.w);
    Mat4::from_rotation_translation(rotation, translation)
}

/// 将 glam Vec3 转换为 Rapier Point
#[inline]
pub fn vec3_to_point(v: Vec3) -> Point3<f32> {
    Point3::new(v.x, v.y, v.z)
}

/// 将 Rapier Point 转换为 glam Vec3
#[inline]
pub fn point_to_vec3(p: &Point3<f32>) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}
