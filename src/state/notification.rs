use std::time::Duration;

pub const NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(4);

/// One-slot notification banner. Each `show` hands out a ticket so a
/// timer armed for an older message cannot hide a newer one.
#[derive(Debug, Default)]
pub struct Banner {
    current: Option<(u64, String)>,
    next_ticket: u64,
}

impl Banner {
    pub fn show(&mut self, message: impl Into<String>) -> u64 {
        self.next_ticket += 1;
        self.current = Some((self.next_ticket, message.into()));
        self.next_ticket
    }

    pub fn message(&self) -> Option<&str> {
        self.current.as_ref().map(|(_, msg)| msg.as_str())
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }

    /// Timer callback. Returns whether the banner was hidden.
    pub fn expire(&mut self, ticket: u64) -> bool {
        match &self.current {
            Some((live, _)) if *live == ticket => {
                self.current = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_only_hides_its_own_message() {
        let mut banner = Banner::default();
        let first = banner.show("one");
        let second = banner.show("two");
        assert!(!banner.expire(first));
        assert_eq!(banner.message(), Some("two"));
        assert!(banner.expire(second));
        assert_eq!(banner.message(), None);
    }

    #[test]
    fn dismiss_clears() {
        let mut banner = Banner::default();
        let ticket = banner.show("hello");
        banner.dismiss();
        assert_eq!(banner.message(), None);
        assert!(!banner.expire(ticket));
    }
}
