//! Rapier3D 关节后端
//!
//! 使用 GenericJoint 实现 Bullet3 的 btSliderConstraint，
//! 使用 SphericalJoint 实现 btPoint2PointConstraint。
//! 单刚体关节在 Bullet 中连接到内部固定刚体，这里对应一个惰性创建的地面刚体。

use glam::{Mat4, Vec3};
use rapier3d::prelude::*;

use super::JointBackend;
use crate::config::get_config;
use crate::math::{isometry_to_mat4, mat4_to_isometry, vec3_to_point};
use crate::{ConstraintError, Result};

/// 滑动关节锁定的自由度：只留下沿 X 的平移和绕 X 的旋转
const SLIDER_LOCKED_AXES: JointAxesMask = JointAxesMask::LIN_Y
    .union(JointAxesMask::LIN_Z)
    .union(JointAxesMask::ANG_Y)
    .union(JointAxesMask::ANG_Z);

/// Rapier 关节后端
///
/// 持有刚体集合与关节集合。关节的生命周期由这里管理，
/// 约束层只保存 `ImpulseJointHandle`。
///
/// 约束层算出的帧/锚点位于刚体质心局部空间（与 Bullet 相同），
/// 而 Rapier 的 `local_frame1/2` 相对于刚体的 `position()`。
/// 因此刚体必须以质心位姿插入：`position = frame · T(com)`，
/// 其中 `frame` 为约束的参考变换，`com` 为 [`crate::MotionState`] 给出的质心偏移。
/// 刚体放在图形原点时关节会偏移 `com`。
pub struct RapierBackend {
    /// 刚体集合
    pub bodies: RigidBodySet,
    /// 冲量关节集合
    pub impulse_joints: ImpulseJointSet,
    /// 单刚体关节的固定端（第一次需要时创建）
    ground: Option<RigidBodyHandle>,
}

impl Default for RapierBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RapierBackend {
    pub fn new() -> Self {
        Self::with_sets(RigidBodySet::new(), ImpulseJointSet::new())
    }

    /// 使用已有的刚体/关节集合
    pub fn with_sets(bodies: RigidBodySet, impulse_joints: ImpulseJointSet) -> Self {
        Self {
            bodies,
            impulse_joints,
            ground: None,
        }
    }

    /// 地面刚体句柄（尚未创建单刚体关节时为 None）
    pub fn ground(&self) -> Option<RigidBodyHandle> {
        self.ground
    }

    /// 交还刚体/关节集合
    pub fn into_sets(self) -> (RigidBodySet, ImpulseJointSet) {
        (self.bodies, self.impulse_joints)
    }

    fn ground_handle(&mut self) -> RigidBodyHandle {
        *self
            .ground
            .get_or_insert_with(|| self.bodies.insert(RigidBodyBuilder::fixed().build()))
    }

    fn check_body(&self, handle: RigidBodyHandle) -> Result<()> {
        if self.bodies.contains(handle) {
            Ok(())
        } else {
            Err(ConstraintError::UnknownBody(handle))
        }
    }

    /// 刚体当前世界位姿
    fn body_pose(&self, handle: RigidBodyHandle) -> Result<Mat4> {
        self.bodies
            .get(handle)
            .map(|body| isometry_to_mat4(body.position()))
            .ok_or(ConstraintError::UnknownBody(handle))
    }

    fn slider_joint(frame1: Mat4, frame2: Mat4) -> GenericJoint {
        let config = get_config();
        GenericJointBuilder::new(SLIDER_LOCKED_AXES)
            .local_frame1(mat4_to_isometry(frame1))
            .local_frame2(mat4_to_isometry(frame2))
            .limits(JointAxis::AngX, config.slider_angular_limit)
            .contacts_enabled(config.contacts_enabled)
            .build()
    }

    fn point_joint(anchor1: Vec3, anchor2: Vec3) -> SphericalJoint {
        SphericalJointBuilder::new()
            .local_anchor1(vec3_to_point(anchor1))
            .local_anchor2(vec3_to_point(anchor2))
            .contacts_enabled(get_config().contacts_enabled)
            .build()
    }

    fn insert(
        &mut self,
        body1: RigidBodyHandle,
        body2: RigidBodyHandle,
        joint: impl Into<GenericJoint>,
    ) -> ImpulseJointHandle {
        self.impulse_joints.insert(body1, body2, joint, get_config().wake_up)
    }

    fn limits(&self, handle: ImpulseJointHandle, axis: JointAxis) -> Option<(f32, f32)> {
        self.impulse_joints
            .get(handle)
            .and_then(|joint| joint.data.limits(axis))
            .map(|limits| (limits.min, limits.max))
    }

    fn set_limits(&mut self, handle: ImpulseJointHandle, axis: JointAxis, lower: f32, upper: f32) -> bool {
        match self.impulse_joints.get_mut(handle) {
            Some(joint) => {
                joint.data.set_limits(axis, [lower, upper]);
                true
            }
            None => false,
        }
    }
}

impl JointBackend for RapierBackend {
    type Handle = ImpulseJointHandle;
    type Joint = ImpulseJoint;

    // Rapier 没有"线性参考帧"的概念，滑动方向总是取关节帧 X 轴
    fn create_slider(
        &mut self,
        body_a: RigidBodyHandle,
        body_b: RigidBodyHandle,
        frame_a: Mat4,
        frame_b: Mat4,
        _use_linear_reference_frame_a: bool,
    ) -> Result<Self::Handle> {
        self.check_body(body_a)?;
        self.check_body(body_b)?;
        let joint = Self::slider_joint(frame_a, frame_b);
        Ok(self.insert(body_a, body_b, joint))
    }

    fn create_slider_single(
        &mut self,
        body_a: RigidBodyHandle,
        frame_a: Mat4,
        _use_linear_reference_frame_a: bool,
    ) -> Result<Self::Handle> {
        // 地面端的帧 = 刚体当前世界位姿下的关节帧
        let ground_frame = self.body_pose(body_a)? * frame_a;
        let ground = self.ground_handle();
        let joint = Self::slider_joint(ground_frame, frame_a);
        Ok(self.insert(ground, body_a, joint))
    }

    fn create_point_to_point(
        &mut self,
        body_a: RigidBodyHandle,
        body_b: RigidBodyHandle,
        pivot_a: Vec3,
        pivot_b: Vec3,
    ) -> Result<Self::Handle> {
        self.check_body(body_a)?;
        self.check_body(body_b)?;
        let joint = Self::point_joint(pivot_a, pivot_b);
        Ok(self.insert(body_a, body_b, joint))
    }

    fn create_point_to_point_single(
        &mut self,
        body_a: RigidBodyHandle,
        pivot_a: Vec3,
    ) -> Result<Self::Handle> {
        let ground_pivot = self.body_pose(body_a)?.transform_point3(pivot_a);
        let ground = self.ground_handle();
        let joint = Self::point_joint(ground_pivot, pivot_a);
        Ok(self.insert(ground, body_a, joint))
    }

    fn set_linear_limit(&mut self, handle: Self::Handle, lower: f32, upper: f32) -> bool {
        self.set_limits(handle, JointAxis::LinX, lower, upper)
    }

    fn set_angular_limit(&mut self, handle: Self::Handle, lower: f32, upper: f32) -> bool {
        self.set_limits(handle, JointAxis::AngX, lower, upper)
    }

    fn linear_limit(&self, handle: Self::Handle) -> Option<(f32, f32)> {
        self.limits(handle, JointAxis::LinX)
    }

    fn angular_limit(&self, handle: Self::Handle) -> Option<(f32, f32)> {
        self.limits(handle, JointAxis::AngX)
    }

    fn native(&self, handle: Self::Handle) -> Option<&Self::Joint> {
        self.impulse_joints.get(handle)
    }

    fn remove_joint(&mut self, handle: Self::Handle) -> bool {
        self.impulse_joints.remove(handle, get_config().wake_up).is_some()
    }
}
