use crate::individual::PersonId;

/// Handle of one token slot in the pool.
pub type TokenId = usize;

/// Tokens available per person. An index token stays attached to its person
/// across cascades; onward tokens are transient, so three per person leaves
/// ample headroom.
pub const TOKENS_PER_PERSON: usize = 3;

struct TraceToken {
    owner: PersonId,
    parent: Option<TokenId>,
    first_child: Option<TokenId>,
    sibling: Option<TokenId>,
    next_free: Option<TokenId>,
}

/// Recyclable pool of tracing-cascade tokens.
///
/// One cascade forms a transient tree: the index token at the root, one child
/// per person reached by the cascade. The tree is what lets a finished
/// cascade find everyone it touched and reset their traced flags before the
/// child tokens go back on the free chain.
pub struct TraceTokenPool {
    slots: Vec<TraceToken>,
    free_head: Option<TokenId>,
    n_free: usize,
}

impl TraceTokenPool {
    #[must_use]
    pub fn new(n_total: usize) -> Self {
        let capacity = TOKENS_PER_PERSON * n_total;
        let slots = (0..capacity)
            .map(|idx| TraceToken {
                owner: 0,
                parent: None,
                first_child: None,
                sibling: None,
                next_free: if idx + 1 < capacity { Some(idx + 1) } else { None },
            })
            .collect();
        Self {
            slots,
            free_head: if capacity > 0 { Some(0) } else { None },
            n_free: capacity,
        }
    }

    #[must_use]
    pub fn n_free(&self) -> usize {
        self.n_free
    }

    #[must_use]
    pub fn owner(&self, token: TokenId) -> PersonId {
        self.slots[token].owner
    }

    pub fn acquire(&mut self, owner: PersonId) -> TokenId {
        let Some(token) = self.free_head else {
            panic!(
                "trace token pool exhausted: all {} tokens belong to live cascades",
                self.slots.len()
            );
        };
        self.free_head = self.slots[token].next_free;
        self.n_free -= 1;
        let slot = &mut self.slots[token];
        slot.owner = owner;
        slot.parent = None;
        slot.first_child = None;
        slot.sibling = None;
        slot.next_free = None;
        token
    }

    /// Allocate a token for `owner` and hang it under `parent`.
    pub fn add_child(&mut self, parent: TokenId, owner: PersonId) -> TokenId {
        let child = self.acquire(owner);
        self.slots[child].parent = Some(parent);
        self.slots[child].sibling = self.slots[parent].first_child;
        self.slots[parent].first_child = Some(child);
        child
    }

    /// Free every descendant of `token`, pushing their owners into `out`.
    /// The token itself stays allocated (index tokens outlive cascades).
    pub fn reclaim_children(&mut self, token: TokenId, out: &mut Vec<PersonId>) {
        let mut stack = Vec::new();
        if let Some(child) = self.slots[token].first_child.take() {
            stack.push(child);
        }
        while let Some(current) = stack.pop() {
            if let Some(sibling) = self.slots[current].sibling {
                stack.push(sibling);
            }
            if let Some(child) = self.slots[current].first_child {
                stack.push(child);
            }
            out.push(self.slots[current].owner);
            self.release(current);
        }
    }

    fn release(&mut self, token: TokenId) {
        let slot = &mut self.slots[token];
        slot.parent = None;
        slot.first_child = None;
        slot.sibling = None;
        slot.next_free = self.free_head;
        self.free_head = Some(token);
        self.n_free += 1;
    }
}
