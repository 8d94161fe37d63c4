//! Detail tabs of the selected application.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetailTab {
    AppInfo,
    Receiver,
    Service,
    Activity,
    ContentProvider,
}

impl DetailTab {
    pub fn title(&self) -> &'static str {
        match self {
            Self::AppInfo => "App info",
            Self::Receiver => "Receivers",
            Self::Service => "Services",
            Self::Activity => "Activities",
            Self::ContentProvider => "Content providers",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TabState {
    titles: Vec<DetailTab>,
    current_index: usize,
}

impl Default for TabState {
    fn default() -> Self {
        Self {
            titles: vec![
                DetailTab::AppInfo,
                DetailTab::Receiver,
                DetailTab::Service,
                DetailTab::Activity,
                DetailTab::ContentProvider,
            ],
            current_index: 0,
        }
    }
}

impl TabState {
    pub fn titles(&self) -> &[DetailTab] {
        &self.titles
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self) -> DetailTab {
        self.titles[self.current_index]
    }

    /// Select tab `index`. Returns `false` (and changes nothing) for the
    /// current index or an index out of range.
    pub fn switch_tab(&mut self, index: usize) -> bool {
        if index == self.current_index || index >= self.titles.len() {
            return false;
        }
        self.current_index = index;
        true
    }
}
