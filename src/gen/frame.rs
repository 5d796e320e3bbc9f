// SPDX-License-Identifier: GPL-2.0-only

//
// Stack frame bookkeeping and aggregate layout
//

use crate::ast::{AggregateKind,Program,Type};
use crate::error::GenError;
use std::collections::HashMap;
use std::fmt::{Display,Formatter};
use std::rc::Rc;

/// Red zone usable by leaf functions below rsp (System V reserves 128 bytes)
pub const RED_ZONE_LIMIT: usize = 120;

pub fn align_up(value: usize, align: usize) -> usize {
    if align <= 1 {
        value
    } else {
        (value + align - 1) / align * align
    }
}

//
// Aggregate layout
//

#[derive(Clone,Debug,PartialEq)]
pub struct Member {
    pub name: Rc<str>,
    pub ty: Type,
    pub offset: usize,
}

#[derive(Clone,Debug,PartialEq)]
pub struct Layout {
    pub size: usize,
    pub align: usize,
    pub members: Vec<Member>,
}

impl Layout {
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| &*m.name == name)
    }
}

/// Members in declaration order, each aligned to its own alignment
pub fn layout(program: &Program, name: &str) -> Result<Layout, GenError> {
    let decl = program.aggregate(AggregateKind::Struct, name)
        .or_else(|| program.aggregate(AggregateKind::Class, name))
        .ok_or_else(|| GenError::Undeclared(name.into()))?;

    let mut size = 0;
    let mut align = 1;
    let mut members = Vec::new();
    for var in &decl.members {
        let (member_size, member_align) = size_align(program, &var.ty)?;
        let offset = align_up(size, member_align);
        members.push(Member { name: var.name.clone(), ty: var.ty.clone(), offset: offset });
        size = offset + member_size;
        align = align.max(member_align);
    }
    Ok(Layout { size: align_up(size, align), align: align, members: members })
}

pub fn size_align(program: &Program, ty: &Type) -> Result<(usize, usize), GenError> {
    match ty {
        Type::Void => Err(GenError::NotReachable("storage of type void".into())),
        Type::Named(name) => {
            let layout = layout(program, name)?;
            Ok((layout.size, layout.align))
        },
        ty => Ok((ty.size(), ty.size())),
    }
}

//
// Unique labels
//

#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash)]
pub struct Label(pub usize);

impl Display for Label {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        write!(fmt, ".L{}", self.0)
    }
}

/// Storage of a local: the slot starts at [rbp-offset]
#[derive(Clone,Debug,PartialEq)]
pub struct Slot {
    pub offset: usize,
    pub ty: Type,
}

//
// Per-function frame state, shared by all nested scopes of a function
//

#[derive(Debug)]
pub struct Frame {
    scopes: Vec<HashMap<Rc<str>, Slot>>,
    // Running base pointer offset, only grows
    bp: usize,
    // Bytes currently pushed
    sp: usize,
    pushed: bool,
    label_no: usize,
}

impl Frame {
    pub fn new() -> Frame {
        Frame {
            scopes: vec![HashMap::new()],
            bp: 0,
            sp: 0,
            pushed: false,
            label_no: 0,
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Reserve a slot, aligning the base pointer first
    pub fn alloc(&mut self, size: usize, align: usize) -> usize {
        self.bp = align_up(self.bp, align) + size;
        self.bp
    }

    pub fn bind(&mut self, name: Rc<str>, slot: Slot) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, slot);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Slot> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn next_label(&mut self) -> Label {
        let label = Label(self.label_no);
        self.label_no += 1;
        label
    }

    pub fn push(&mut self) {
        self.sp += 8;
        self.pushed = true;
    }

    pub fn pop(&mut self) {
        self.sp -= 8;
    }

    pub fn bp(&self) -> usize {
        self.bp
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    /// Can locals live below rsp without reserving them?
    pub fn uses_red_zone(&self, mno_red_zone: bool) -> bool {
        !mno_red_zone && !self.pushed && self.bp < RED_ZONE_LIMIT
    }

    /// Stack reservation keeping rsp 16 byte aligned
    pub fn frame_size(&self) -> usize {
        align_up(self.bp, 16)
    }
}
