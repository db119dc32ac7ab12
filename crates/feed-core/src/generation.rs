/// Identifies one issued list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Hands out increasing tickets so a response to a superseded request can be
/// recognised and dropped.
#[derive(Debug, Clone, Default)]
pub struct RequestGeneration {
    latest: u64,
}

impl RequestGeneration {
    pub fn issue(&mut self) -> Ticket {
        self.latest += 1;
        Ticket(self.latest)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_latest_ticket_is_current() {
        let mut g = RequestGeneration::default();
        let first = g.issue();
        assert!(g.is_current(first));
        let second = g.issue();
        assert!(!g.is_current(first));
        assert!(g.is_current(second));
        assert!(first < second);
    }
}
