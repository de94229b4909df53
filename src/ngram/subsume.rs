//! Subsumption index over the n-gram table.
//!
//! A lower-arity n-gram is subsumed by a higher-arity one when its termid
//! tuple is a contiguous substring of the other's.  Scanning the whole
//! table per row would be quadratic, so an inverted index maps each termid
//! to the rows it participates in; candidate rows are found by merging
//! those lists and verified with an explicit substring check.
//!
//! Postings lists live in one flat arena of (row, next) pairs with -1 as
//! the null index, so building the index is a single allocation plus
//! appends.

use crate::ngram::{NgramRow, MAX_NGRAM_ARITY};

const NIL: i32 = -1;

#[derive(Clone, Copy)]
struct ListHead {
    head: i32,
    tail: i32,
}

#[derive(Clone, Copy)]
struct ListElt {
    row: i32,
    next: i32,
}

pub struct SubsumptionIndex {
    heads: Vec<ListHead>,
    arena: Vec<ListElt>,
}

impl SubsumptionIndex {
    /// Build the index over every row below the maximum arity present.
    /// Rows of maximum arity can subsume but never be subsumed, so they
    /// stay out of the lists.
    pub fn build(rows: &[NgramRow]) -> SubsumptionIndex {
        let highest_arity = rows.first().map(|r| r.arity).unwrap_or(0);
        let mut highest_termid = 0u32;
        let mut total_postings = 0usize;
        for row in rows {
            if row.arity < highest_arity {
                total_postings += row.arity;
                for &tid in row.termids() {
                    highest_termid = highest_termid.max(tid);
                }
            }
        }

        let mut index = SubsumptionIndex {
            heads: vec![ListHead { head: NIL, tail: NIL }; highest_termid as usize + 1],
            arena: Vec::with_capacity(total_postings),
        };
        for (r, row) in rows.iter().enumerate() {
            if row.arity == highest_arity {
                continue;
            }
            for &tid in row.termids() {
                index.append(tid, r as i32);
            }
        }
        index
    }

    fn append(&mut self, termid: u32, row: i32) {
        let new_item = self.arena.len() as i32;
        self.arena.push(ListElt { row, next: NIL });
        let head = &mut self.heads[termid as usize];
        if head.head == NIL {
            head.head = new_item;
        } else {
            self.arena[head.tail as usize].next = new_item;
        }
        head.tail = new_item;
    }

    fn list_head(&self, termid: u32) -> i32 {
        self.heads
            .get(termid as usize)
            .map(|h| h.head)
            .unwrap_or(NIL)
    }

    /// All rows subsumed by the n-gram `termids`, found by intersecting
    /// the participants' postings lists.  A candidate needs at least two
    /// of the termids' lists to meet on the same row; actual containment
    /// is then verified by substring match.
    pub fn find_subsumed(&self, termids: &[u32], rows: &[NgramRow]) -> Vec<usize> {
        let arity = termids.len();
        let mut refs = Vec::new();
        if arity == 2 {
            return refs; // bigrams can subsume nothing below them
        }

        let mut curpos = [NIL; MAX_NGRAM_ARITY];
        let mut exhausted = [false; MAX_NGRAM_ARITY];
        for (a, &tid) in termids.iter().enumerate() {
            let head = self.list_head(tid);
            curpos[a] = head;
            exhausted[a] = head == NIL;
        }

        // The merge tracks the highest row number any list currently
        // points at; only rows every live list can reach are candidates.
        let mut highest = NIL;
        for a in 0..arity {
            if !exhausted[a] {
                highest = highest.max(self.arena[curpos[a] as usize].row);
            }
        }
        if highest == NIL {
            return refs;
        }

        loop {
            // Advance every list to `highest` and count the lists sitting
            // exactly on it.
            let mut count = 0;
            for a in 0..arity {
                while !exhausted[a] && self.arena[curpos[a] as usize].row < highest {
                    let next = self.arena[curpos[a] as usize].next;
                    if next == NIL {
                        exhausted[a] = true;
                    } else {
                        curpos[a] = next;
                    }
                }
                if !exhausted[a] && self.arena[curpos[a] as usize].row == highest {
                    count += 1;
                }
            }

            if count >= 2 && subsumes(termids, rows[highest as usize].termids()) {
                refs.push(highest as usize);
            }

            // Step every list past the row just considered, picking up the
            // next highest row.
            let old_highest = highest;
            let mut live = 0;
            for a in 0..arity {
                if exhausted[a] {
                    continue;
                }
                live += 1;
                while self.arena[curpos[a] as usize].row == old_highest {
                    let next = self.arena[curpos[a] as usize].next;
                    if next == NIL {
                        exhausted[a] = true;
                        live -= 1;
                        break;
                    }
                    curpos[a] = next;
                }
                if !exhausted[a] {
                    highest = highest.max(self.arena[curpos[a] as usize].row);
                }
            }
            if live < 2 {
                break;
            }
        }

        refs
    }
}

/// True when `sub` occurs as a contiguous substring of `sup`.
pub fn subsumes(sup: &[u32], sub: &[u32]) -> bool {
    if sub.len() > sup.len() {
        return false;
    }
    sup.windows(sub.len()).any(|w| w == sub)
}
