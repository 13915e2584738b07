//! 滑动约束与扭转滑动约束
//!
//! 关节原语的滑动轴固定为局部 X 轴。创建时先把配置的滑动轴
//! 转到刚体 A 的局部朝向，再求出把 X 轴对齐到该方向的旋转，
//! 最后扣除各自的质心偏移得到两端的关节帧。

use std::fmt;

use glam::{Mat4, Vec3};
use rapier3d::prelude::RigidBodyHandle;

use super::{Constraint, ConstraintCore, ConstraintKind};
use crate::backend::JointBackend;
use crate::body::{resolve_center_of_mass, BodyRef, BodySlot};
use crate::config::get_config;
use crate::math::{rotate_between, strip_translation};
use crate::{ConstraintError, Result};

/// 关节原语的滑动轴（局部 X）
pub const SLIDER_AXIS: Vec3 = Vec3::X;

/// 滑动约束参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slider {
    /// 滑动方向（刚体 A 参考变换的世界朝向下）
    pub axis: Vec3,
    /// 沿滑动轴的位移限制 (lower, upper)，不检查 lower <= upper
    pub limit: (f32, f32),
}

impl Default for Slider {
    fn default() -> Self {
        Self {
            axis: SLIDER_AXIS,
            limit: (0.0, 0.0),
        }
    }
}

/// 滑动关节的创建参数（帧位于刚体质心局部空间）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderPlan {
    body_a: RigidBodyHandle,
    frame_a: Mat4,
    /// 单刚体时为 None
    b: Option<(RigidBodyHandle, Mat4)>,
}

impl SliderPlan {
    pub fn frame_a(&self) -> Mat4 {
        self.frame_a
    }

    pub fn frame_b(&self) -> Option<Mat4> {
        self.b.map(|(_, frame_b)| frame_b)
    }
}

impl Slider {
    pub fn new(axis: Vec3, lower: f32, upper: f32) -> Self {
        Self {
            axis,
            limit: (lower, upper),
        }
    }

    /// 计算关节帧
    ///
    /// - A 帧 = T(-com_a) · R
    /// - B 帧 = frame_a · frame_b⁻¹ · T(-com_b) · R
    ///
    /// R 把 X 轴旋转到 A 局部空间中的滑动方向。
    fn joint_frames<H: Copy>(&self, core: &ConstraintCore<H>) -> Result<SliderPlan> {
        let body_a = core.require_body_a()?;

        // 世界朝向下的滑动轴 → A 的局部朝向
        let orientation = strip_translation(core.frame_a());
        let axis_in_a = orientation.inverse().transform_vector3(self.axis);

        let align = rotate_between(SLIDER_AXIS, axis_in_a, get_config().min_axis_length)
            .ok_or(ConstraintError::DegenerateAxis(self.axis))?;

        let b = match core.body_b() {
            Some(body_b) => {
                let com_b = resolve_center_of_mass(body_b, BodySlot::B)?;
                let b_to_a = core.frame_a() * core.frame_b().inverse();
                Some((body_b.handle(), b_to_a * Mat4::from_translation(-com_b) * align))
            }
            None => None,
        };

        let com_a = resolve_center_of_mass(body_a, BodySlot::A)?;
        let frame_a = Mat4::from_translation(-com_a) * align;

        Ok(SliderPlan {
            body_a: body_a.handle(),
            frame_a,
            b,
        })
    }

    /// 按单/双刚体选择构造入口，并写入线性限制
    fn build_slider<B: JointBackend>(&self, plan: SliderPlan, backend: &mut B) -> Result<B::Handle> {
        let handle = match plan.b {
            Some((body_b, frame_b)) => backend.create_slider(plan.body_a, body_b, plan.frame_a, frame_b, false)?,
            None => backend.create_slider_single(plan.body_a, plan.frame_a, true)?,
        };

        let (lower, upper) = self.limit;
        backend.set_linear_limit(handle, lower, upper);
        Ok(handle)
    }
}

impl ConstraintKind for Slider {
    type Plan = SliderPlan;

    fn name(&self) -> &'static str {
        "SliderConstraint"
    }

    fn plan<H: Copy>(&self, core: &ConstraintCore<H>) -> Result<SliderPlan> {
        self.joint_frames(core)
    }

    fn build<B: JointBackend>(&self, plan: SliderPlan, backend: &mut B) -> Result<B::Handle> {
        self.build_slider(plan, backend)
    }
}

/// 扭转滑动约束参数
///
/// 与滑动约束相同，但放开绕滑动轴的旋转。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TwistSlider(pub Slider);

impl TwistSlider {
    pub fn new(axis: Vec3, lower: f32, upper: f32) -> Self {
        Self(Slider::new(axis, lower, upper))
    }
}

impl From<Slider> for TwistSlider {
    fn from(slider: Slider) -> Self {
        Self(slider)
    }
}

impl ConstraintKind for TwistSlider {
    type Plan = SliderPlan;

    fn name(&self) -> &'static str {
        "TwistSliderConstraint"
    }

    fn plan<H: Copy>(&self, core: &ConstraintCore<H>) -> Result<SliderPlan> {
        self.0.joint_frames(core)
    }

    fn build<B: JointBackend>(&self, plan: SliderPlan, backend: &mut B) -> Result<B::Handle> {
        let handle = self.0.build_slider(plan, backend)?;
        // 滑动关节默认锁死扭转，这里放开到 ±π
        let limit = get_config().twist_angular_limit;
        backend.set_angular_limit(handle, -limit, limit);
        Ok(handle)
    }
}

/// 带滑动参数的约束类型
pub trait SlideParams: ConstraintKind {
    fn slider(&self) -> &Slider;
    fn slider_mut(&mut self) -> &mut Slider;
}

impl SlideParams for Slider {
    fn slider(&self) -> &Slider {
        self
    }

    fn slider_mut(&mut self) -> &mut Slider {
        self
    }
}

impl SlideParams for TwistSlider {
    fn slider(&self) -> &Slider {
        &self.0
    }

    fn slider_mut(&mut self) -> &mut Slider {
        &mut self.0
    }
}

pub type SliderConstraint<H = rapier3d::prelude::ImpulseJointHandle> = Constraint<Slider, H>;
pub type TwistSliderConstraint<H = rapier3d::prelude::ImpulseJointHandle> = Constraint<TwistSlider, H>;

impl<K: SlideParams, H: Copy + fmt::Debug> Constraint<K, H> {
    pub fn axis(&self) -> Vec3 {
        self.kind.slider().axis
    }

    pub fn limit(&self) -> (f32, f32) {
        self.kind.slider().limit
    }

    /// 修改滑动轴，需要重建关节
    pub fn set_axis(&mut self, axis: Vec3) {
        self.kind_mut().slider_mut().axis = axis;
    }

    /// 修改线性限制
    ///
    /// 关节有效时直接写入关节，不重建也不改变脏标记，返回 true；
    /// 否则标记为脏，下次创建时生效，返回 false。
    pub fn set_limit<B>(&mut self, backend: &mut B, lower: f32, upper: f32) -> bool
    where
        B: JointBackend<Handle = H>,
    {
        self.kind.slider_mut().limit = (lower, upper);

        if let Some(handle) = self.core.live_joint() {
            if backend.set_linear_limit(handle, lower, upper) {
                return true;
            }
            log::debug!("[Constraint] {}: 关节 {:?} 已不在后端中，等待重建", self.kind.name(), handle);
        }
        self.core.dirty = true;
        false
    }

    /// 以原生滑动关节访问；关节无效时为 None
    pub fn as_native_slider<'b, B>(&self, backend: &'b B) -> Option<&'b B::Joint>
    where
        B: JointBackend<Handle = H>,
    {
        self.core.live_joint().and_then(|handle| backend.native(handle))
    }
}

impl<H: Copy + fmt::Debug> Constraint<Slider, H> {
    /// 单刚体滑动约束（另一端为世界）
    pub fn single_body(body_a: BodyRef, frame_a: Mat4, axis: Vec3, limit: (f32, f32)) -> Self {
        Self::from_parts(Some(body_a), frame_a, None, Mat4::IDENTITY, Slider::new(axis, limit.0, limit.1))
    }

    pub fn two_body(
        body_a: BodyRef,
        frame_a: Mat4,
        body_b: BodyRef,
        frame_b: Mat4,
        axis: Vec3,
        limit: (f32, f32),
    ) -> Self {
        Self::from_parts(Some(body_a), frame_a, Some(body_b), frame_b, Slider::new(axis, limit.0, limit.1))
    }
}

impl<H: Copy + fmt::Debug> Constraint<TwistSlider, H> {
    /// 单刚体扭转滑动约束（另一端为世界）
    pub fn single_body(body_a: BodyRef, frame_a: Mat4, axis: Vec3, limit: (f32, f32)) -> Self {
        Self::from_parts(Some(body_a), frame_a, None, Mat4::IDENTITY, TwistSlider::new(axis, limit.0, limit.1))
    }

    pub fn two_body(
        body_a: BodyRef,
        frame_a: Mat4,
        body_b: BodyRef,
        frame_b: Mat4,
        axis: Vec3,
        limit: (f32, f32),
    ) -> Self {
        Self::from_parts(Some(body_a), frame_a, Some(body_b), frame_b, TwistSlider::new(axis, limit.0, limit.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{JointCall, RapierBackend, RecordedJointId, RecordingBackend};
    use crate::init_test_logger;
    use crate::math::isometry_to_mat4;
    use glam::Quat;
    use rapier3d::prelude::{RigidBodyBuilder, RigidBodyHandle};
    use std::f32::consts::PI;

    fn handle(i: u32) -> RigidBodyHandle {
        RigidBodyHandle::from_raw_parts(i, 0)
    }

    fn frame_a() -> Mat4 {
        Mat4::from_rotation_translation(Quat::from_rotation_y(0.4), Vec3::new(1.0, 2.0, 3.0))
    }

    fn frame_b() -> Mat4 {
        Mat4::from_rotation_translation(Quat::from_rotation_x(-0.3), Vec3::new(4.0, 0.0, -1.0))
    }

    const COM_A: Vec3 = Vec3::new(0.0, 0.5, 0.0);
    const COM_B: Vec3 = Vec3::new(0.2, 0.0, 0.0);
    const AXIS: Vec3 = Vec3::new(0.0, 1.0, 1.0);

    fn two_body_slider() -> SliderConstraint<RecordedJointId> {
        SliderConstraint::two_body(
            BodyRef::with_center_of_mass(handle(0), COM_A),
            frame_a(),
            BodyRef::with_center_of_mass(handle(1), COM_B),
            frame_b(),
            AXIS,
            (-1.0, 2.0),
        )
    }

    /// 独立重算期望的关节帧
    fn expected_frames() -> (Mat4, Mat4) {
        let orientation = Mat4::from_quat(Quat::from_rotation_y(0.4));
        let axis_in_a = orientation.inverse().transform_vector3(AXIS).normalize();
        let align = Mat4::from_quat(Quat::from_rotation_arc(Vec3::X, axis_in_a));
        let expected_a = Mat4::from_translation(-COM_A) * align;
        let expected_b = frame_a() * frame_b().inverse() * Mat4::from_translation(-COM_B) * align;
        (expected_a, expected_b)
    }

    fn created_slider(backend: &RecordingBackend) -> (Mat4, Mat4, bool) {
        match backend.last_created() {
            Some(JointCall::Slider { frame_a, frame_b, use_linear_reference_frame_a, .. }) => {
                (*frame_a, *frame_b, *use_linear_reference_frame_a)
            }
            other => panic!("expected two-body slider, got {:?}", other),
        }
    }

    #[test]
    fn test_two_body_frames() {
        let mut backend = RecordingBackend::new();
        let mut c = two_body_slider();
        let joint = c.joint(&mut backend).unwrap();

        let (frame_a, frame_b, use_linear_reference_frame_a) = created_slider(&backend);
        let (expected_a, expected_b) = expected_frames();
        assert!(frame_a.abs_diff_eq(expected_a, 1e-5));
        assert!(frame_b.abs_diff_eq(expected_b, 1e-5));
        assert!(!use_linear_reference_frame_a);

        // 关节 X 轴经 A 的朝向回到世界后，与配置的滑动轴同向
        let world_axis = Quat::from_rotation_y(0.4) * frame_a.transform_vector3(Vec3::X);
        assert!(world_axis.abs_diff_eq(AXIS.normalize(), 1e-5));
        // A 帧原点位于图形原点（质心的反方向）
        assert!(frame_a.transform_point3(Vec3::ZERO).abs_diff_eq(-COM_A, 1e-5));

        assert_eq!(backend.linear_limit(joint), Some((-1.0, 2.0)));
        assert_eq!(backend.angular_limit(joint), Some((0.0, 0.0)));
        assert!(!c.is_dirty());
    }

    #[test]
    fn test_single_body_uses_single_overload() {
        let mut backend = RecordingBackend::new();
        let body = BodyRef::with_center_of_mass(handle(0), COM_A);
        let mut c: SliderConstraint<RecordedJointId> =
            SliderConstraint::single_body(body, frame_a(), AXIS, (0.0, 1.0));
        c.joint(&mut backend).unwrap();

        assert_eq!(backend.calls.len(), 1);
        match &backend.calls[0] {
            JointCall::SliderSingle { body_a, frame_a, use_linear_reference_frame_a } => {
                assert_eq!(*body_a, handle(0));
                assert!(frame_a.abs_diff_eq(expected_frames().0, 1e-5));
                assert!(*use_linear_reference_frame_a);
            }
            other => panic!("expected single-body slider, got {:?}", other),
        }
    }

    #[test]
    fn test_set_limit_updates_live_joint() {
        let mut backend = RecordingBackend::new();
        let mut c = two_body_slider();
        let joint = c.joint(&mut backend).unwrap();

        assert!(c.set_limit(&mut backend, -3.0, 4.0));
        assert!(!c.is_dirty());
        assert_eq!(c.limit(), (-3.0, 4.0));
        assert_eq!(c.joint(&mut backend), Some(joint));
        assert_eq!(backend.linear_limit(joint), Some((-3.0, 4.0)));
        assert_eq!(backend.calls.len(), 1);
    }

    #[test]
    fn test_set_limit_while_dirty_defers() {
        let mut backend = RecordingBackend::new();
        let mut c = two_body_slider();

        assert!(!c.set_limit(&mut backend, 0.5, 0.75));
        assert!(c.is_dirty());
        assert!(backend.calls.is_empty());

        let joint = c.joint(&mut backend).unwrap();
        assert_eq!(backend.linear_limit(joint), Some((0.5, 0.75)));
    }

    #[test]
    fn test_set_limit_on_removed_joint_marks_dirty() {
        let mut backend = RecordingBackend::new();
        let mut c = two_body_slider();
        let joint = c.joint(&mut backend).unwrap();
        backend.remove_joint(joint);

        assert!(!c.set_limit(&mut backend, 0.0, 1.0));
        assert!(c.is_dirty());
    }

    #[test]
    fn test_setters_force_rebuild() {
        let mut backend = RecordingBackend::new();
        let mut c = two_body_slider();
        let first = c.joint(&mut backend).unwrap();

        c.set_axis(Vec3::Z);
        assert!(c.is_dirty());
        let second = c.joint(&mut backend).unwrap();
        assert_ne!(first, second);
        let (frame_a, _, _) = created_slider(&backend);
        let world_axis = Quat::from_rotation_y(0.4) * frame_a.transform_vector3(Vec3::X);
        assert!(world_axis.abs_diff_eq(Vec3::Z, 1e-5));

        let new_frame_a = Mat4::from_translation(Vec3::new(-5.0, 0.0, 0.0));
        c.set_frame_a(new_frame_a);
        let third = c.joint(&mut backend).unwrap();
        assert_ne!(second, third);
        let (_, built_b, _) = created_slider(&backend);
        let align = Mat4::from_quat(Quat::from_rotation_arc(Vec3::X, Vec3::Z));
        let expected_b = new_frame_a * frame_b().inverse() * Mat4::from_translation(-COM_B) * align;
        assert!(built_b.abs_diff_eq(expected_b, 1e-5));

        let new_frame_b = Mat4::from_translation(Vec3::new(0.0, 0.0, 7.0));
        c.set_frame_b(new_frame_b);
        c.joint(&mut backend).unwrap();
        let (_, built_b, _) = created_slider(&backend);
        let expected_b = new_frame_a * new_frame_b.inverse() * Mat4::from_translation(-COM_B) * align;
        assert!(built_b.abs_diff_eq(expected_b, 1e-5));

        c.set_bodies(Some(BodyRef::with_center_of_mass(handle(3), Vec3::ZERO)), None);
        let last = c.joint(&mut backend).unwrap();
        assert!(matches!(
            backend.native(last).map(|joint| &joint.created_by),
            Some(JointCall::SliderSingle { body_a, .. }) if *body_a == handle(3)
        ));

        // 每次重建都移除了旧关节
        assert_eq!(backend.live_count(), 1);
    }

    #[test]
    fn test_missing_motion_state() {
        init_test_logger();
        let mut backend = RecordingBackend::new();
        let mut c: SliderConstraint<RecordedJointId> = SliderConstraint::two_body(
            BodyRef::with_center_of_mass(handle(0), COM_A),
            frame_a(),
            BodyRef::without_motion_state(handle(1)),
            frame_b(),
            AXIS,
            (0.0, 1.0),
        );
        assert_eq!(
            c.create_joint(&mut backend),
            Err(ConstraintError::InvalidMotionState(BodySlot::B))
        );

        c.set_bodies(Some(BodyRef::without_motion_state(handle(0))), None);
        assert_eq!(
            c.create_joint(&mut backend),
            Err(ConstraintError::InvalidMotionState(BodySlot::A))
        );
        assert!(c.is_dirty());
        assert!(c.cached_joint().is_none());
        assert!(backend.calls.is_empty());
    }

    #[test]
    fn test_failed_rebuild_keeps_engine_joint() {
        init_test_logger();
        let mut backend = RecordingBackend::new();
        let mut c = two_body_slider();
        let joint = c.joint(&mut backend).unwrap();

        // 每种校验失败都不接触后端
        c.set_axis(Vec3::ZERO);
        assert_eq!(c.create_joint(&mut backend), Err(ConstraintError::DegenerateAxis(Vec3::ZERO)));
        c.set_axis(AXIS);
        c.set_bodies(
            Some(BodyRef::with_center_of_mass(handle(0), COM_A)),
            Some(BodyRef::without_motion_state(handle(1))),
        );
        assert_eq!(c.create_joint(&mut backend), Err(ConstraintError::InvalidMotionState(BodySlot::B)));
        c.set_bodies(None, None);
        assert_eq!(c.joint(&mut backend), None);

        assert!(c.is_dirty());
        assert!(c.as_native_slider(&backend).is_none());
        assert_eq!(c.cached_joint(), Some(joint));
        assert!(backend.native(joint).is_some());
        assert!(!backend.calls.contains(&JointCall::Remove(joint)));

        // 下一次成功重建时才移除旧关节
        c.set_bodies(Some(BodyRef::with_center_of_mass(handle(0), COM_A)), None);
        let rebuilt = c.joint(&mut backend).unwrap();
        assert_ne!(rebuilt, joint);
        assert!(backend.native(joint).is_none());
        assert_eq!(backend.live_count(), 1);
    }

    #[test]
    fn test_rapier_failed_rebuild_keeps_engine_joint() {
        init_test_logger();
        let mut backend = RapierBackend::new();
        let a = backend.bodies.insert(RigidBodyBuilder::dynamic().build());
        let b = backend.bodies.insert(RigidBodyBuilder::dynamic().build());

        let mut c = SliderConstraint::two_body(
            BodyRef::with_center_of_mass(a, COM_A),
            frame_a(),
            BodyRef::with_center_of_mass(b, COM_B),
            frame_b(),
            AXIS,
            (-1.0, 2.0),
        );
        let joint = c.joint(&mut backend).unwrap();
        assert_eq!(backend.impulse_joints.len(), 1);

        c.set_bodies(None, None);
        assert_eq!(c.joint(&mut backend), None);
        assert_eq!(backend.impulse_joints.len(), 1);
        assert!(backend.impulse_joints.get(joint).is_some());

        // 上层可以取出句柄自行释放
        assert_eq!(c.take_joint(), Some(joint));
        assert!(backend.remove_joint(joint));
        assert_eq!(backend.impulse_joints.len(), 0);
    }

    #[test]
    fn test_plan_matches_created_frames() {
        let c = two_body_slider();
        let plan = c.kind().plan(c.core()).unwrap();
        let (expected_a, expected_b) = expected_frames();
        assert!(plan.frame_a().abs_diff_eq(expected_a, 1e-5));
        assert!(plan.frame_b().unwrap().abs_diff_eq(expected_b, 1e-5));

        let single: SliderConstraint<RecordedJointId> =
            SliderConstraint::single_body(BodyRef::with_center_of_mass(handle(0), COM_A), frame_a(), AXIS, (0.0, 1.0));
        assert!(single.kind().plan(single.core()).unwrap().frame_b().is_none());
    }

    #[test]
    fn test_degenerate_axis() {
        init_test_logger();
        let mut backend = RecordingBackend::new();
        let mut c = two_body_slider();
        c.set_axis(Vec3::ZERO);
        assert_eq!(
            c.create_joint(&mut backend),
            Err(ConstraintError::DegenerateAxis(Vec3::ZERO))
        );
    }

    #[test]
    fn test_twist_slider_opens_angular_limit() {
        let mut backend = RecordingBackend::new();
        let mut c: TwistSliderConstraint<RecordedJointId> = TwistSliderConstraint::two_body(
            BodyRef::with_center_of_mass(handle(0), COM_A),
            frame_a(),
            BodyRef::with_center_of_mass(handle(1), COM_B),
            frame_b(),
            AXIS,
            (-1.0, 2.0),
        );
        let joint = c.joint(&mut backend).unwrap();

        assert_eq!(backend.angular_limit(joint), Some((-PI, PI)));
        assert_eq!(backend.linear_limit(joint), Some((-1.0, 2.0)));
        assert!(!c.is_dirty());

        // 与普通滑动约束使用相同的关节帧
        let (frame_a, frame_b, _) = created_slider(&backend);
        let (expected_a, expected_b) = expected_frames();
        assert!(frame_a.abs_diff_eq(expected_a, 1e-5));
        assert!(frame_b.abs_diff_eq(expected_b, 1e-5));

        // 原地修改限制不会动角度限制
        assert!(c.set_limit(&mut backend, 0.0, 0.5));
        assert_eq!(backend.angular_limit(joint), Some((-PI, PI)));
        assert!(c.as_native_slider(&backend).is_some());
    }

    #[test]
    fn test_twist_slider_failure() {
        init_test_logger();
        let mut backend = RecordingBackend::new();
        let mut c: TwistSliderConstraint<RecordedJointId> = Constraint::new(TwistSlider::default());
        assert_eq!(c.joint(&mut backend), None);
        assert!(c.is_dirty());
        assert!(c.as_native_slider(&backend).is_none());
    }

    #[test]
    fn test_slider_equality_refines_base() {
        let a = two_body_slider();
        let mut b = two_body_slider();
        assert!(a == b);

        b.set_axis(Vec3::X);
        assert!(a != b);
        assert!(a.core() == b.core());
    }

    #[test]
    fn test_rapier_slider() {
        let mut backend = RapierBackend::new();
        let a = backend.bodies.insert(RigidBodyBuilder::dynamic().build());
        let b = backend.bodies.insert(RigidBodyBuilder::dynamic().build());

        let mut c = SliderConstraint::two_body(
            BodyRef::with_center_of_mass(a, COM_A),
            frame_a(),
            BodyRef::with_center_of_mass(b, COM_B),
            frame_b(),
            AXIS,
            (-1.0, 2.0),
        );
        let joint = c.joint(&mut backend).unwrap();

        let native = c.as_native_slider(&backend).unwrap();
        let (expected_a, expected_b) = expected_frames();
        assert_eq!(native.body1, a);
        assert_eq!(native.body2, b);
        assert!(isometry_to_mat4(&native.data.local_frame1).abs_diff_eq(expected_a, 1e-4));
        assert!(isometry_to_mat4(&native.data.local_frame2).abs_diff_eq(expected_b, 1e-4));
        assert_eq!(backend.linear_limit(joint), Some((-1.0, 2.0)));

        assert!(c.set_limit(&mut backend, -0.25, 0.25));
        assert_eq!(c.joint(&mut backend), Some(joint));
        assert_eq!(backend.linear_limit(joint), Some((-0.25, 0.25)));
    }
}
