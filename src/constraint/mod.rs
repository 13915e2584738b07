//! 约束系统
//!
//! 核心设计思想：
//! - ConstraintCore: 所有约束共享的状态（刚体、参考变换、脏标记、关节句柄）
//! - ConstraintKind: 各类约束自己的参数与关节创建算法
//! - Constraint<K, H>: 两者组合，负责惰性创建与脏标记协议
//! - AnyConstraint: 封闭的约束类型集合，供上层统一持有
//!
//! 关节句柄不拥有关节：约束被丢弃时不会销毁关节，
//! 需要释放时由上层通过 [`Constraint::take_joint`] 取出并交给后端移除。

mod ball_and_socket;
mod placeholder;
mod slider;

pub use ball_and_socket::{BallAndSocket, BallAndSocketConstraint, PointToPointPlan};
pub use placeholder::{Placeholder, PlaceholderConstraint, PlaceholderKind};
pub use slider::{SlideParams, Slider, SliderConstraint, SliderPlan, TwistSlider, TwistSliderConstraint};

use std::fmt;

use glam::Mat4;
use rapier3d::prelude::ImpulseJointHandle;

use crate::backend::JointBackend;
use crate::body::BodyRef;
use crate::config::get_config;
use crate::{ConstraintError, Result};

// ============================================================================
// 共享状态
// ============================================================================

/// 约束共享状态
#[derive(Debug)]
pub struct ConstraintCore<H> {
    /// 刚体 A（必需，缺失时无法创建关节）
    body_a: Option<BodyRef>,
    /// 刚体 B（None 表示与世界相连）
    body_b: Option<BodyRef>,
    /// 刚体 A 配置时的世界参考变换
    frame_a: Mat4,
    /// 刚体 B 配置时的世界参考变换
    frame_b: Mat4,
    /// 缓存的关节句柄（不拥有）
    joint: Option<H>,
    /// true 表示关节缺失或已过期
    dirty: bool,
}

impl<H: Copy> ConstraintCore<H> {
    fn new(body_a: Option<BodyRef>, frame_a: Mat4, body_b: Option<BodyRef>, frame_b: Mat4) -> Self {
        Self {
            body_a,
            body_b,
            frame_a,
            frame_b,
            joint: None,
            dirty: true,
        }
    }

    pub fn body_a(&self) -> Option<&BodyRef> {
        self.body_a.as_ref()
    }

    pub fn body_b(&self) -> Option<&BodyRef> {
        self.body_b.as_ref()
    }

    pub fn frame_a(&self) -> Mat4 {
        self.frame_a
    }

    pub fn frame_b(&self) -> Mat4 {
        self.frame_b
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// 缓存的句柄（可能已过期）
    pub fn cached_joint(&self) -> Option<H> {
        self.joint
    }

    /// 当前有效的关节：存在且未过期
    pub fn live_joint(&self) -> Option<H> {
        if self.dirty {
            None
        } else {
            self.joint
        }
    }

    /// 刚体 A 是创建任何关节的前提
    pub fn require_body_a(&self) -> Result<&BodyRef> {
        self.body_a.as_ref().ok_or(ConstraintError::MissingBodyA)
    }
}

/// 基础相等性：只比较参考变换，不比较刚体与关节状态
impl<H> PartialEq for ConstraintCore<H> {
    fn eq(&self, other: &Self) -> bool {
        self.frame_a == other.frame_a && self.frame_b == other.frame_b
    }
}

// ============================================================================
// 约束类型接口
// ============================================================================

/// 约束类型：持有自己的参数并实现关节创建
///
/// 创建分两步：`plan` 只做校验和局部帧计算，不接触后端；
/// `build` 拿着算好的参数调用后端构造入口。
/// 缓存与脏标记由 [`Constraint::create_joint`] 处理。
pub trait ConstraintKind: Clone + PartialEq + fmt::Debug {
    /// 校验通过后交给 `build` 的创建参数
    type Plan;

    /// 日志中使用的名称
    fn name(&self) -> &'static str;

    /// 校验刚体与参数，计算刚体质心局部空间中的帧/锚点
    fn plan<H: Copy>(&self, core: &ConstraintCore<H>) -> Result<Self::Plan>;

    /// 通过后端创建关节
    fn build<B: JointBackend>(&self, plan: Self::Plan, backend: &mut B) -> Result<B::Handle>;
}

// ============================================================================
// 约束
// ============================================================================

/// 约束 = 共享状态 + 类型参数
#[derive(Debug)]
pub struct Constraint<K, H = ImpulseJointHandle> {
    core: ConstraintCore<H>,
    kind: K,
}

impl<K: ConstraintKind, H: Copy + fmt::Debug> Constraint<K, H> {
    /// 未配置刚体的约束，参考变换为单位矩阵
    pub fn new(kind: K) -> Self {
        Self::from_parts(None, Mat4::IDENTITY, None, Mat4::IDENTITY, kind)
    }

    /// 只设置刚体，参考变换为单位矩阵
    pub fn with_bodies(body_a: Option<BodyRef>, body_b: Option<BodyRef>, kind: K) -> Self {
        Self::from_parts(body_a, Mat4::IDENTITY, body_b, Mat4::IDENTITY, kind)
    }

    pub fn from_parts(
        body_a: Option<BodyRef>,
        frame_a: Mat4,
        body_b: Option<BodyRef>,
        frame_b: Mat4,
        kind: K,
    ) -> Self {
        Self {
            core: ConstraintCore::new(body_a, frame_a, body_b, frame_b),
            kind,
        }
    }

    /// 获取关节（惰性创建）
    ///
    /// 有效缓存直接返回；否则重新创建。创建失败返回 None，原因见日志。
    pub fn joint<B>(&mut self, backend: &mut B) -> Option<H>
    where
        B: JointBackend<Handle = H>,
    {
        if let Some(handle) = self.core.live_joint() {
            return Some(handle);
        }
        self.create_joint(backend).ok()
    }

    /// 立即（重新）创建关节
    ///
    /// 校验失败时不接触后端：旧关节仍留在引擎中，句柄仍可通过
    /// [`Self::cached_joint`] / [`Self::take_joint`] 取得，约束保持脏标记。
    /// 校验通过后，旧关节在调用构造入口之前从后端移除。
    pub fn create_joint<B>(&mut self, backend: &mut B) -> Result<H>
    where
        B: JointBackend<Handle = H>,
    {
        self.core.dirty = true;

        let plan = match self.kind.plan(&self.core) {
            Ok(plan) => plan,
            Err(err) => {
                err.log(self.kind.name());
                return Err(err);
            }
        };

        if let Some(stale) = self.core.joint.take() {
            backend.remove_joint(stale);
        }

        match self.kind.build(plan, backend) {
            Ok(handle) => {
                self.core.joint = Some(handle);
                self.core.dirty = false;
                if get_config().debug_log {
                    log::info!("[Constraint] {} 关节创建完成: {:?}", self.kind.name(), handle);
                }
                Ok(handle)
            }
            Err(err) => {
                err.log(self.kind.name());
                Err(err)
            }
        }
    }

    /// 替换刚体，标记为脏
    pub fn set_bodies(&mut self, body_a: Option<BodyRef>, body_b: Option<BodyRef>) {
        self.core.body_a = body_a;
        self.core.body_b = body_b;
        self.core.dirty = true;
    }

    pub fn set_frame_a(&mut self, frame_a: Mat4) {
        self.core.frame_a = frame_a;
        self.core.dirty = true;
    }

    pub fn set_frame_b(&mut self, frame_b: Mat4) {
        self.core.frame_b = frame_b;
        self.core.dirty = true;
    }

    pub fn mark_dirty(&mut self, dirty: bool) {
        self.core.dirty = dirty;
    }

    pub fn is_dirty(&self) -> bool {
        self.core.dirty
    }

    /// 缓存的句柄，不触发创建
    pub fn cached_joint(&self) -> Option<H> {
        self.core.joint
    }

    /// 取出关节句柄交给上层释放，约束变为脏
    pub fn take_joint(&mut self) -> Option<H> {
        self.core.dirty = true;
        self.core.joint.take()
    }

    pub fn core(&self) -> &ConstraintCore<H> {
        &self.core
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    pub fn body_a(&self) -> Option<&BodyRef> {
        self.core.body_a()
    }

    pub fn body_b(&self) -> Option<&BodyRef> {
        self.core.body_b()
    }

    pub fn frame_a(&self) -> Mat4 {
        self.core.frame_a
    }

    pub fn frame_b(&self) -> Mat4 {
        self.core.frame_b
    }

    /// 修改类型参数，并标记为脏
    pub(crate) fn kind_mut(&mut self) -> &mut K {
        self.core.dirty = true;
        &mut self.kind
    }
}

/// 克隆只复制配置；克隆体没有关节，第一次访问时自己创建
impl<K: Clone, H> Clone for Constraint<K, H> {
    fn clone(&self) -> Self {
        Self {
            core: ConstraintCore {
                body_a: self.core.body_a.clone(),
                body_b: self.core.body_b.clone(),
                frame_a: self.core.frame_a,
                frame_b: self.core.frame_b,
                joint: None,
                dirty: true,
            },
            kind: self.kind.clone(),
        }
    }
}

/// 类型相等性：参考变换相同且类型参数相同
impl<K: PartialEq, H> PartialEq for Constraint<K, H> {
    fn eq(&self, other: &Self) -> bool {
        self.core == other.core && self.kind == other.kind
    }
}

// ============================================================================
// 封闭的约束集合
// ============================================================================

/// 所有约束类型的统一封装
#[derive(Debug, Clone, PartialEq)]
pub enum AnyConstraint<H = ImpulseJointHandle> {
    Slider(SliderConstraint<H>),
    TwistSlider(TwistSliderConstraint<H>),
    BallAndSocket(BallAndSocketConstraint<H>),
    Placeholder(PlaceholderConstraint<H>),
}

macro_rules! dispatch {
    ($self:expr, $c:ident => $body:expr) => {
        match $self {
            AnyConstraint::Slider($c) => $body,
            AnyConstraint::TwistSlider($c) => $body,
            AnyConstraint::BallAndSocket($c) => $body,
            AnyConstraint::Placeholder($c) => $body,
        }
    };
}

impl<H: Copy + fmt::Debug> AnyConstraint<H> {
    pub fn kind_name(&self) -> &'static str {
        dispatch!(self, c => c.kind().name())
    }

    pub fn core(&self) -> &ConstraintCore<H> {
        dispatch!(self, c => c.core())
    }

    pub fn joint<B>(&mut self, backend: &mut B) -> Option<H>
    where
        B: JointBackend<Handle = H>,
    {
        dispatch!(self, c => c.joint(backend))
    }

    pub fn create_joint<B>(&mut self, backend: &mut B) -> Result<H>
    where
        B: JointBackend<Handle = H>,
    {
        dispatch!(self, c => c.create_joint(backend))
    }

    pub fn set_bodies(&mut self, body_a: Option<BodyRef>, body_b: Option<BodyRef>) {
        dispatch!(self, c => c.set_bodies(body_a, body_b))
    }

    pub fn set_frame_a(&mut self, frame_a: Mat4) {
        dispatch!(self, c => c.set_frame_a(frame_a))
    }

    pub fn set_frame_b(&mut self, frame_b: Mat4) {
        dispatch!(self, c => c.set_frame_b(frame_b))
    }

    pub fn mark_dirty(&mut self, dirty: bool) {
        dispatch!(self, c => c.mark_dirty(dirty))
    }

    pub fn is_dirty(&self) -> bool {
        dispatch!(self, c => c.is_dirty())
    }

    pub fn take_joint(&mut self) -> Option<H> {
        dispatch!(self, c => c.take_joint())
    }
}

impl<H> From<SliderConstraint<H>> for AnyConstraint<H> {
    fn from(c: SliderConstraint<H>) -> Self {
        AnyConstraint::Slider(c)
    }
}

impl<H> From<TwistSliderConstraint<H>> for AnyConstraint<H> {
    fn from(c: TwistSliderConstraint<H>) -> Self {
        AnyConstraint::TwistSlider(c)
    }
}

impl<H> From<BallAndSocketConstraint<H>> for AnyConstraint<H> {
    fn from(c: BallAndSocketConstraint<H>) -> Self {
        AnyConstraint::BallAndSocket(c)
    }
}

impl<H> From<PlaceholderConstraint<H>> for AnyConstraint<H> {
    fn from(c: PlaceholderConstraint<H>) -> Self {
        AnyConstraint::Placeholder(c)
    }
}
