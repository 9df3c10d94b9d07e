//! The owner-tree index.
//!
//! A lazily built tree of `(start, tag, end)` triples mirroring the
//! nesting of definitions and templates, so a forward reference can find
//! its enclosing owner without unpickling anything first.
//!
//! Member definitions inside a `TEMPLATE` are recorded at the *enclosing*
//! level: member owners are classes, not templates. The template node
//! itself keeps only the non-member statements as children.

use crate::error::{ReaderError, ReaderResult};
use tasty_format::{Addr, TagCategory, TastyCursor, TastyTag};

/// Index of a node inside the owner-tree arena.
pub type NodeId = usize;

/// One owner-tree node.
pub struct OwnerNode {
    pub start: Addr,
    /// `None` only for the synthetic root spanning the whole section.
    pub tag: Option<TastyTag>,
    /// First byte after the tag, length and name-reference slots.
    content: Addr,
    pub end: Addr,
    /// Populated at most once, on first demand.
    children: Option<Vec<NodeId>>,
}

impl OwnerNode {
    #[inline]
    pub fn contains(&self, addr: Addr) -> bool {
        addr.is_within(self.start, self.end)
    }
}

/// What a scan pass collects.
#[derive(Copy, Clone, Eq, PartialEq)]
enum ScanMode {
    /// Record every definition node.
    AllDefs,
    /// Record only member definitions (used to hoist a template's members
    /// to the enclosing level).
    MemberDefsOnly,
    /// Record everything except member definitions (the template's own
    /// child list).
    NoMemberDefs,
}

/// The arena-backed owner tree.
pub struct OwnerIndex {
    nodes: Vec<OwnerNode>,
}

impl OwnerIndex {
    /// An index over a section of `len` bytes, children unscanned.
    pub fn new(len: u32) -> OwnerIndex {
        OwnerIndex {
            nodes: vec![OwnerNode {
                start: Addr::new(0),
                tag: None,
                content: Addr::new(0),
                end: Addr::new(len),
                children: None,
            }],
        }
    }

    pub const ROOT: NodeId = 0;

    #[inline]
    pub fn node(&self, id: NodeId) -> &OwnerNode {
        &self.nodes[id]
    }

    /// The children of a node, scanning the byte range on first demand.
    pub fn children(&mut self, id: NodeId, bytes: &[u8]) -> ReaderResult<Vec<NodeId>> {
        if self.nodes[id].children.is_none() {
            let (content, end, tag) = {
                let node = &self.nodes[id];
                (node.content, node.end, node.tag)
            };
            let mode = if tag == Some(TastyTag::Template) {
                ScanMode::NoMemberDefs
            } else {
                ScanMode::AllDefs
            };
            let mut collected = Vec::new();
            let mut cursor = TastyCursor::new(bytes).sub_reader(content, end);
            self.scan_trees(&mut cursor, end, mode, &mut collected)?;
            let ids: Vec<NodeId> = collected
                .into_iter()
                .map(|node| {
                    let id = self.nodes.len();
                    self.nodes.push(node);
                    id
                })
                .collect();
            self.nodes[id].children = Some(ids);
        }
        Ok(self.nodes[id].children.clone().unwrap_or_default())
    }

    fn scan_trees(
        &mut self,
        cursor: &mut TastyCursor<'_>,
        end: Addr,
        mode: ScanMode,
        out: &mut Vec<OwnerNode>,
    ) -> ReaderResult<()> {
        while cursor.current_addr() < end {
            self.scan_tree(cursor, mode, out)?;
        }
        if !cursor.is_at(end) {
            return Err(ReaderError::format(
                format!("definition scan overran its range at {}", cursor.current_addr()),
                "<toplevel>",
            ));
        }
        Ok(())
    }

    fn scan_tree(
        &mut self,
        cursor: &mut TastyCursor<'_>,
        mode: ScanMode,
        out: &mut Vec<OwnerNode>,
    ) -> ReaderResult<()> {
        let start = cursor.current_addr();
        let tag = cursor.read_tag()?;
        if tag.is_member_def() || tag == TastyTag::Template {
            let payload_end = cursor.read_end()?;
            for _ in 0..tag.name_ref_slots() {
                cursor.read_long_nat()?;
            }
            let content = cursor.current_addr();
            if tag == TastyTag::Template {
                // hoist member definitions to the enclosing level
                let mut members = cursor.fork();
                self.scan_trees(&mut members, payload_end, ScanMode::MemberDefsOnly, out)?;
            }
            if mode != ScanMode::NoMemberDefs {
                out.push(OwnerNode {
                    start,
                    tag: Some(tag),
                    content,
                    end: payload_end,
                    children: None,
                });
            }
            cursor.goto(payload_end);
            return Ok(());
        }
        if mode == ScanMode::MemberDefsOnly {
            return Ok(cursor.skip_tree_tagged(tag)?);
        }
        match tag.category() {
            TagCategory::Length => {
                let payload_end = cursor.read_end()?;
                for _ in 0..tag.name_ref_slots() {
                    cursor.read_long_nat()?;
                }
                self.scan_trees(cursor, payload_end, ScanMode::AllDefs, out)?;
            }
            TagCategory::NatAst => {
                cursor.read_long_nat()?;
                self.scan_tree(cursor, ScanMode::AllDefs, out)?;
            }
            TagCategory::Ast => {
                self.scan_tree(cursor, ScanMode::AllDefs, out)?;
            }
            TagCategory::Nat => {
                cursor.read_long_nat()?;
            }
            TagCategory::TagOnly => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_nat(out: &mut Vec<u8>, mut value: u64) {
        let mut groups = [0u8; 10];
        let mut n = 0;
        loop {
            groups[n] = (value & 0x7f) as u8;
            value >>= 7;
            n += 1;
            if value == 0 {
                break;
            }
        }
        for i in (0..n).rev() {
            out.push(groups[i] | if i == 0 { 0x80 } else { 0 });
        }
    }

    /// Append a length-prefixed tree with the given payload.
    fn framed(out: &mut Vec<u8>, tag: TastyTag, payload: &[u8]) {
        out.push(tag as u8);
        put_nat(out, payload.len() as u64);
        out.extend_from_slice(payload);
    }

    #[test]
    fn member_defs_become_nodes() {
        // VALDEF <name=1> TRUEconst -- a value with a one-byte tpt stand-in
        let mut payload = Vec::new();
        put_nat(&mut payload, 1);
        payload.push(TastyTag::TrueConst as u8);
        let mut bytes = Vec::new();
        framed(&mut bytes, TastyTag::ValDef, &payload);

        let mut index = OwnerIndex::new(bytes.len() as u32);
        let children = index.children(OwnerIndex::ROOT, &bytes).unwrap();
        assert_eq!(children.len(), 1);
        let node = index.node(children[0]);
        assert_eq!(node.tag, Some(TastyTag::ValDef));
        assert_eq!(node.start, Addr::new(0));
        assert_eq!(node.end, Addr::new(bytes.len() as u32));
    }

    #[test]
    fn template_members_are_hoisted_to_the_enclosing_level() {
        // TYPEDEF <name=1> TEMPLATE( DEFDEF <name=2> TRUEconst )
        let mut defdef = Vec::new();
        put_nat(&mut defdef, 2);
        defdef.push(TastyTag::TrueConst as u8);
        let mut template_payload = Vec::new();
        framed(&mut template_payload, TastyTag::DefDef, &defdef);
        let mut typedef_payload = Vec::new();
        put_nat(&mut typedef_payload, 1);
        framed(&mut typedef_payload, TastyTag::Template, &template_payload);
        let mut bytes = Vec::new();
        framed(&mut bytes, TastyTag::TypeDef, &typedef_payload);

        let mut index = OwnerIndex::new(bytes.len() as u32);
        let top = index.children(OwnerIndex::ROOT, &bytes).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(index.node(top[0]).tag, Some(TastyTag::TypeDef));

        // children of the TYPEDEF: the hoisted DEFDEF, then the TEMPLATE
        let inner = index.children(top[0], &bytes).unwrap();
        let tags: Vec<_> = inner.iter().map(|&id| index.node(id).tag).collect();
        assert_eq!(
            tags,
            vec![Some(TastyTag::DefDef), Some(TastyTag::Template)]
        );

        // the template's own child list does not repeat the member
        let template = inner[1];
        assert!(index.children(template, &bytes).unwrap().is_empty());
    }

    #[test]
    fn children_populate_once() {
        let mut payload = Vec::new();
        put_nat(&mut payload, 1);
        payload.push(TastyTag::TrueConst as u8);
        let mut bytes = Vec::new();
        framed(&mut bytes, TastyTag::ValDef, &payload);

        let mut index = OwnerIndex::new(bytes.len() as u32);
        let first = index.children(OwnerIndex::ROOT, &bytes).unwrap();
        let second = index.children(OwnerIndex::ROOT, &bytes).unwrap();
        assert_eq!(first, second);
    }
}
