//! 记录型关节后端
//!
//! 不做任何物理计算，只记录构造参数和当前限制。
//! 用于验证约束层传给引擎的帧、锚点以及调用的构造入口。

use std::collections::HashMap;

use glam::{Mat4, Vec3};
use rapier3d::prelude::RigidBodyHandle;

use super::JointBackend;
use crate::config::get_config;
use crate::Result;

/// 记录后端分配的关节编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordedJointId(pub u32);

/// 一次后端调用
#[derive(Debug, Clone, PartialEq)]
pub enum JointCall {
    Slider {
        body_a: RigidBodyHandle,
        body_b: RigidBodyHandle,
        frame_a: Mat4,
        frame_b: Mat4,
        use_linear_reference_frame_a: bool,
    },
    SliderSingle {
        body_a: RigidBodyHandle,
        frame_a: Mat4,
        use_linear_reference_frame_a: bool,
    },
    PointToPoint {
        body_a: RigidBodyHandle,
        body_b: RigidBodyHandle,
        pivot_a: Vec3,
        pivot_b: Vec3,
    },
    PointToPointSingle {
        body_a: RigidBodyHandle,
        pivot_a: Vec3,
    },
    Remove(RecordedJointId),
}

impl JointCall {
    fn is_slider(&self) -> bool {
        matches!(self, JointCall::Slider { .. } | JointCall::SliderSingle { .. })
    }
}

/// 存活的关节
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedJoint {
    /// 创建该关节的调用
    pub created_by: JointCall,
    pub linear_limit: Option<(f32, f32)>,
    pub angular_limit: Option<(f32, f32)>,
}

/// 记录型后端
#[derive(Debug, Default)]
pub struct RecordingBackend {
    /// 按顺序记录的所有调用
    pub calls: Vec<JointCall>,
    joints: HashMap<RecordedJointId, RecordedJoint>,
    next_id: u32,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前存活的关节数量
    pub fn live_count(&self) -> usize {
        self.joints.len()
    }

    /// 最近一次创建调用
    pub fn last_created(&self) -> Option<&JointCall> {
        self.calls.iter().rev().find(|call| !matches!(call, JointCall::Remove(_)))
    }

    fn record(&mut self, call: JointCall) -> RecordedJointId {
        let id = RecordedJointId(self.next_id);
        self.next_id += 1;

        // 与 Bullet 一致：滑动关节默认带角度限制，球窝关节没有
        let angular_limit = if call.is_slider() {
            let [lower, upper] = get_config().slider_angular_limit;
            Some((lower, upper))
        } else {
            None
        };
        self.joints.insert(id, RecordedJoint {
            created_by: call.clone(),
            linear_limit: None,
            angular_limit,
        });
        self.calls.push(call);
        id
    }
}

impl JointBackend for RecordingBackend {
    type Handle = RecordedJointId;
    type Joint = RecordedJoint;

    fn create_slider(
        &mut self,
        body_a: RigidBodyHandle,
        body_b: RigidBodyHandle,
        frame_a: Mat4,
        frame_b: Mat4,
        use_linear_reference_frame_a: bool,
    ) -> Result<Self::Handle> {
        Ok(self.record(JointCall::Slider {
            body_a,
            body_b,
            frame_a,
            frame_b,
            use_linear_reference_frame_a,
        }))
    }

    fn create_slider_single(
        &mut self,
        body_a: RigidBodyHandle,
        frame_a: Mat4,
        use_linear_reference_frame_a: bool,
    ) -> Result<Self::Handle> {
        Ok(self.record(JointCall::SliderSingle {
            body_a,
            frame_a,
            use_linear_reference_frame_a,
        }))
    }

    fn create_point_to_point(
        &mut self,
        body_a: RigidBodyHandle,
        body_b: RigidBodyHandle,
        pivot_a: Vec3,
        pivot_b: Vec3,
    ) -> Result<Self::Handle> {
        Ok(self.record(JointCall::PointToPoint {
            body_a,
            body_b,
            pivot_a,
            pivot_b,
        }))
    }

    fn create_point_to_point_single(
        &mut self,
        body_a: RigidBodyHandle,
        pivot_a: Vec3,
    ) -> Result<Self::Handle> {
        Ok(self.record(JointCall::PointToPointSingle { body_a, pivot_a }))
    }

    fn set_linear_limit(&mut self, handle: Self::Handle, lower: f32, upper: f32) -> bool {
        match self.joints.get_mut(&handle) {
            Some(joint) => {
                joint.linear_limit = Some((lower, upper));
                true
            }
            None => false,
        }
    }

    fn set_angular_limit(&mut self, handle: Self::Handle, lower: f32, upper: f32) -> bool {
        match self.joints.get_mut(&handle) {
            Some(joint) => {
                joint.angular_limit = Some((lower, upper));
                true
            }
            None => false,
        }
    }

    fn linear_limit(&self, handle: Self::Handle) -> Option<(f32, f32)> {
        self.joints.get(&handle).and_then(|joint| joint.linear_limit)
    }

    fn angular_limit(&self, handle: Self::Handle) -> Option<(f32, f32)> {
        self.joints.get(&handle).and_then(|joint| joint.angular_limit)
    }

    fn native(&self, handle: Self::Handle) -> Option<&Self::Joint> {
        self.joints.get(&handle)
    }

    fn remove_joint(&mut self, handle: Self::Handle) -> bool {
        let removed = self.joints.remove(&handle).is_some();
        if removed {
            self.calls.push(JointCall::Remove(handle));
        }
        removed
    }
}
