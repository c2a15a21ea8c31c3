//! One script per site page. Each arms its effects through the shared
//! [`PageContext`](crate::runtime::PageContext).

mod academics;
mod gallery;
mod home;
mod members;

pub use self::academics::AcademicsPage;
pub use self::gallery::GalleryPage;
pub use self::home::HomePage;
pub use self::members::MembersPage;

use crate::dom::Dom;
use crate::runtime::{PageKind, PageScript};

pub fn script_for<D: Dom + 'static>(kind: PageKind) -> Box<dyn PageScript<D>> {
    match kind {
        PageKind::Home => Box::new(HomePage::default()),
        PageKind::Academics => Box::new(AcademicsPage),
        PageKind::Members => Box::new(MembersPage),
        PageKind::Gallery => Box::new(GalleryPage),
    }
}
