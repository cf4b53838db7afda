//! 队列与移动协调器
//!
//! 维护当天全部病例：每个手术间一条有序队列，外加一条未排房的
//! 急诊队列。队列位置对非 OFF Case 病例保持 1..N 连续编号；
//! OFF Case 病例留在原位展示但不占号。
//!
//! 跨房移动会对照排班判断目标房归属，归属不符时返回
//! `NeedsConfirmation` 控制信号而不是错误。

use chrono::{NaiveDate, NaiveDateTime};
use orboard_core::{CaseState, OperativeRecord, OrBoardError, Period, Result, SurgeryCase};
use orboard_schedule::AssignmentResolver;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::countdown::resume_instant;
use crate::state_machine::{CaseEvent, ReadinessStateMachine};

/// 同房内移动方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// 移动后某条队列的最新顺序（`room` 为 None 表示未排房队列）
#[derive(Debug, Clone, PartialEq)]
pub struct RoomOrder {
    pub room: Option<String>,
    pub order: Vec<Uuid>,
}

/// 移动操作的结果
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// 移动完成，附受影响队列的新顺序
    Moved(Vec<RoomOrder>),
    /// 无事可做（已在边界、位置未变）
    Unchanged,
    /// 目标房归属不符，需要操作员确认
    NeedsConfirmation { room: String, owner: String },
}

/// 当天看板的队列协调器
pub struct QueueCoordinator {
    date: NaiveDate,
    cases: HashMap<Uuid, SurgeryCase>,
    room_orders: HashMap<String, Vec<Uuid>>,
    unscheduled: Vec<Uuid>,
    resolver: Arc<AssignmentResolver>,
}

impl QueueCoordinator {
    pub fn new(date: NaiveDate, resolver: Arc<AssignmentResolver>) -> Self {
        Self {
            date,
            cases: HashMap::new(),
            room_orders: HashMap::new(),
            unscheduled: Vec::new(),
            resolver,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// 接收病例：按其房间字段追加到对应队列尾部并重新编号
    pub fn insert_case(&mut self, case: SurgeryCase) {
        let id = case.id;
        let room = case.room.clone();
        self.cases.insert(id, case);
        match &room {
            Some(r) => self.room_orders.entry(r.clone()).or_default().push(id),
            None => self.unscheduled.push(id),
        }
        self.renumber(room.as_deref());
    }

    pub fn case(&self, id: Uuid) -> Option<&SurgeryCase> {
        self.cases.get(&id)
    }

    pub fn cases(&self) -> impl Iterator<Item = &SurgeryCase> {
        self.cases.values()
    }

    /// 某条队列的病例，按队列顺序
    pub fn cases_in(&self, room: Option<&str>) -> Vec<&SurgeryCase> {
        self.order_of(room)
            .iter()
            .filter_map(|id| self.cases.get(id))
            .collect()
    }

    pub fn room_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.room_orders.keys().cloned().collect();
        names.sort();
        names
    }

    fn order_of(&self, room: Option<&str>) -> &[Uuid] {
        match room {
            Some(r) => self.room_orders.get(r).map(Vec::as_slice).unwrap_or(&[]),
            None => &self.unscheduled,
        }
    }

    fn order_of_mut(&mut self, room: Option<&str>) -> &mut Vec<Uuid> {
        match room {
            Some(r) => self.room_orders.entry(r.to_string()).or_default(),
            None => &mut self.unscheduled,
        }
    }

    fn is_participant(&self, id: Uuid) -> bool {
        self.cases
            .get(&id)
            .map(|c| !c.is_off_case())
            .unwrap_or(false)
    }

    fn require_case(&self, id: Uuid) -> Result<&SurgeryCase> {
        self.cases
            .get(&id)
            .ok_or_else(|| OrBoardError::NotFound(id.to_string()))
    }

    /// 队列编号：非 OFF Case 病例依次取 1..N，OFF Case 清空编号
    fn renumber(&mut self, room: Option<&str>) {
        let ids: Vec<Uuid> = self.order_of(room).to_vec();
        let mut pos = 0u32;
        for id in ids {
            let participant = self.is_participant(id);
            if let Some(case) = self.cases.get_mut(&id) {
                case.queue_position = if participant {
                    pos += 1;
                    Some(pos)
                } else {
                    None
                };
            }
        }
    }

    fn snapshot(&self, room: Option<&str>) -> RoomOrder {
        RoomOrder {
            room: room.map(str::to_string),
            order: self.order_of(room).to_vec(),
        }
    }

    /// 同房内上移/下移一格
    ///
    /// 与相邻的参与排序病例交换位置；OFF Case 病例跳过不动。
    /// 已在边界时返回 Unchanged。
    pub fn move_within_room(&mut self, id: Uuid, direction: MoveDirection) -> Result<MoveOutcome> {
        let case = self.require_case(id)?;
        if case.is_off_case() {
            return Err(OrBoardError::TerminalState(case.state.to_string()));
        }
        let room = case.room.clone();

        let order = self.order_of(room.as_deref());
        let Some(idx) = order.iter().position(|x| *x == id) else {
            return Err(OrBoardError::NotFound(id.to_string()));
        };

        // 向上/向下找最近的参与排序邻居
        let neighbor = match direction {
            MoveDirection::Up => order[..idx]
                .iter()
                .rev()
                .position(|x| self.is_participant(*x))
                .map(|off| idx - 1 - off),
            MoveDirection::Down => order[idx + 1..]
                .iter()
                .position(|x| self.is_participant(*x))
                .map(|off| idx + 1 + off),
        };
        let Some(nidx) = neighbor else {
            return Ok(MoveOutcome::Unchanged);
        };

        self.order_of_mut(room.as_deref()).swap(idx, nidx);
        self.renumber(room.as_deref());
        tracing::debug!("Case {} moved {:?} within {:?}", id, direction, room);
        Ok(MoveOutcome::Moved(vec![self.snapshot(room.as_deref())]))
    }

    /// 判断把 `case` 放进 `room` 是否需要跨房确认
    ///
    /// 归属以病例排程时段对照当日排班，fuzzy 匹配主刀医生。
    /// 排班未覆盖（周末、无排班条目）时不要求确认。
    fn confirmation_for(&self, case: &SurgeryCase, room: &str) -> Option<(String, String)> {
        let period = Period::of_time(case.scheduled_time);
        match self
            .resolver
            .owner_matches(room, self.date, period, &case.surgeon)
        {
            Some(false) => Some((
                room.to_string(),
                self.resolver
                    .owner_display(room, self.date)
                    .unwrap_or_default(),
            )),
            _ => None,
        }
    }

    /// 拖入目标房队列尾部
    pub fn drop_into_room(
        &mut self,
        id: Uuid,
        room: &str,
        confirmed: bool,
    ) -> Result<MoveOutcome> {
        let case = self.require_case(id)?;
        if case.is_off_case() {
            return Err(OrBoardError::TerminalState(case.state.to_string()));
        }
        let source = case.room.clone();
        if source.as_deref() == Some(room) {
            return Ok(MoveOutcome::Unchanged);
        }
        if !confirmed {
            if let Some((room, owner)) = self.confirmation_for(case, room) {
                return Ok(MoveOutcome::NeedsConfirmation { room, owner });
            }
        }

        self.order_of_mut(source.as_deref()).retain(|x| *x != id);
        self.order_of_mut(Some(room)).push(id);
        if let Some(case) = self.cases.get_mut(&id) {
            case.room = Some(room.to_string());
        }
        self.renumber(source.as_deref());
        self.renumber(Some(room));
        tracing::info!("Case {} moved from {:?} to {}", id, source, room);
        Ok(MoveOutcome::Moved(vec![
            self.snapshot(source.as_deref()),
            self.snapshot(Some(room)),
        ]))
    }

    /// 拖放到某个病例之前（目标病例所在队列即目的队列）
    pub fn insert_before(
        &mut self,
        id: Uuid,
        target: Uuid,
        confirmed: bool,
    ) -> Result<MoveOutcome> {
        if id == target {
            return Ok(MoveOutcome::Unchanged);
        }
        let case = self.require_case(id)?;
        if case.is_off_case() {
            return Err(OrBoardError::TerminalState(case.state.to_string()));
        }
        let source = case.room.clone();
        let dest = self.require_case(target)?.room.clone();
        // 先验证目标在目的队列里，避免半途失败丢病例
        if !self.order_of(dest.as_deref()).contains(&target) {
            return Err(OrBoardError::NotFound(target.to_string()));
        }

        // 仅跨队列进房才需要归属确认
        if !confirmed && source != dest {
            if let Some(room) = dest.as_deref() {
                let case = self.require_case(id)?;
                if let Some((room, owner)) = self.confirmation_for(case, room) {
                    return Ok(MoveOutcome::NeedsConfirmation { room, owner });
                }
            }
        }

        self.order_of_mut(source.as_deref()).retain(|x| *x != id);
        let dest_order = self.order_of_mut(dest.as_deref());
        let idx = dest_order
            .iter()
            .position(|x| *x == target)
            .ok_or_else(|| OrBoardError::NotFound(target.to_string()))?;
        dest_order.insert(idx, id);
        if let Some(case) = self.cases.get_mut(&id) {
            case.room = dest.clone();
        }

        if source == dest {
            self.renumber(dest.as_deref());
            Ok(MoveOutcome::Moved(vec![self.snapshot(dest.as_deref())]))
        } else {
            self.renumber(source.as_deref());
            self.renumber(dest.as_deref());
            Ok(MoveOutcome::Moved(vec![
                self.snapshot(source.as_deref()),
                self.snapshot(dest.as_deref()),
            ]))
        }
    }

    /// 在当前队列内直接指定 1 起算的队列位置
    ///
    /// 位置按参与排序的病例计数；越界或位置未变返回 Unchanged。
    pub fn set_queue_position(&mut self, id: Uuid, position: u32) -> Result<MoveOutcome> {
        let case = self.require_case(id)?;
        if case.is_off_case() {
            return Err(OrBoardError::TerminalState(case.state.to_string()));
        }
        if position == 0 {
            return Ok(MoveOutcome::Unchanged);
        }
        if case.queue_position == Some(position) {
            return Ok(MoveOutcome::Unchanged);
        }
        let room = case.room.clone();

        let mut order: Vec<Uuid> = self.order_of(room.as_deref()).to_vec();
        order.retain(|x| *x != id);

        // 找到第 position 个参与名额对应的插入下标
        let mut seen = 0u32;
        let mut insert_at = None;
        for (i, other) in order.iter().enumerate() {
            if self.is_participant(*other) {
                seen += 1;
                if seen == position {
                    insert_at = Some(i);
                    break;
                }
            }
        }
        let insert_at = match insert_at {
            Some(i) => i,
            // 恰好落到队尾也是合法位置
            None if seen + 1 == position => order.len(),
            None => return Ok(MoveOutcome::Unchanged),
        };

        order.insert(insert_at, id);
        *self.order_of_mut(room.as_deref()) = order;
        self.renumber(room.as_deref());
        Ok(MoveOutcome::Moved(vec![self.snapshot(room.as_deref())]))
    }

    /// 附上术中记录
    pub fn attach_operative(&mut self, id: Uuid, record: OperativeRecord) -> Result<()> {
        let case = self
            .cases
            .get_mut(&id)
            .ok_or_else(|| OrBoardError::NotFound(id.to_string()))?;
        case.operative = record;
        Ok(())
    }

    /// 套用状态机事件；进入 OFF Case 时让出队列编号
    pub fn apply_event(
        &mut self,
        sm: &ReadinessStateMachine,
        id: Uuid,
        event: CaseEvent,
        now: NaiveDateTime,
    ) -> Result<CaseState> {
        let case = self
            .cases
            .get_mut(&id)
            .ok_or_else(|| OrBoardError::NotFound(id.to_string()))?;
        let room = case.room.clone();
        let state = sm.apply(case, event, now)?;
        if state == CaseState::OffCase {
            self.renumber(room.as_deref());
        }
        Ok(state)
    }

    /// 找出定时暂缓已到点的病例
    ///
    /// 跨午夜规则只对未排房队列生效（由配置开关控制）。
    pub fn due_timed_holds(&self, now: NaiveDateTime, overnight_unscheduled: bool) -> Vec<Uuid> {
        self.cases
            .values()
            .filter(|c| c.state == CaseState::TimedHold)
            .filter(|c| {
                let Some(resume_at) = c.hold_until else {
                    return false;
                };
                let set_at = c.hold_set_at.unwrap_or(now);
                let overnight = overnight_unscheduled && c.room.is_none();
                now >= resume_instant(resume_at, set_at, overnight)
            })
            .map(|c| c.id)
            .collect()
    }
}
