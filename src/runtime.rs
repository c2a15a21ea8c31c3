//! Page lifecycle: one [`PageRuntime`] per page view, re-initialized in
//! place and torn down on unload.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use log::{debug, info};

use crate::config::SiteConfig;
use crate::dom::Dom;
use crate::error::FxError;
use crate::host::{EventKind, Host, Listener, ListenerSet};
use crate::pages;
use crate::scroll::ScrollTriggers;
use crate::tween::Tweens;

/// Everything a page script registers goes through here, so one `clear`
/// undoes all of it.
pub struct PageContext<D: Dom> {
    pub host: Rc<dyn Host>,
    pub dom: Rc<D>,
    pub config: Rc<SiteConfig>,
    pub tweens: Tweens<D>,
    pub triggers: ScrollTriggers<D>,
    listeners: RefCell<ListenerSet>,
    seed: Cell<u64>,
}

impl<D: Dom + 'static> PageContext<D> {
    pub fn new(host: Rc<dyn Host>, dom: Rc<D>, config: Rc<SiteConfig>) -> Self {
        let seed = host.now().to_bits() ^ 0x5EED_C1AB_F00D_0001;
        Self {
            tweens: Tweens::new(host.clone(), dom.clone()),
            triggers: ScrollTriggers::new(host.clone(), dom.clone()),
            host,
            dom,
            config,
            listeners: RefCell::new(ListenerSet::new()),
            seed: Cell::new(seed),
        }
    }

    pub fn keep(&self, listener: Listener) {
        self.listeners.borrow_mut().push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// A fresh seed for each randomized effect on the page.
    pub fn next_seed(&self) -> u64 {
        let next = self
            .seed
            .get()
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.seed.set(next);
        next
    }

    /// Kill every tween, scroll trigger and listener.
    pub fn clear(&self) {
        self.tweens.kill_all();
        self.triggers.kill_all();
        let listeners = std::mem::take(&mut *self.listeners.borrow_mut());
        drop(listeners);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PageKind {
    Home,
    Academics,
    Members,
    Gallery,
}

impl FromStr for PageKind {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "home" | "" | "index" => Ok(Self::Home),
            "academics" | "akademik" => Ok(Self::Academics),
            "members" | "anggota" => Ok(Self::Members),
            "gallery" | "galeri" => Ok(Self::Gallery),
            other => Err(FxError::Config(format!("unknown page `{other}`"))),
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Home => "home",
            Self::Academics => "academics",
            Self::Members => "members",
            Self::Gallery => "gallery",
        })
    }
}

/// A page's own setup. Registrations made through the context are undone by
/// the runtime; `teardown` only has to drop what the script owns itself.
pub trait PageScript<D: Dom> {
    fn init(&mut self, ctx: &PageContext<D>);

    fn teardown(&mut self) {}
}

pub struct PageRuntime<D: Dom> {
    kind: PageKind,
    ctx: PageContext<D>,
    script: Box<dyn PageScript<D>>,
    initialized: bool,
    inits: usize,
    unload: Option<Listener>,
}

impl<D: Dom + 'static> PageRuntime<D> {
    pub fn new(kind: PageKind, host: Rc<dyn Host>, dom: Rc<D>, config: Rc<SiteConfig>) -> Self {
        Self {
            kind,
            ctx: PageContext::new(host, dom, config),
            script: pages::script_for(kind),
            initialized: false,
            inits: 0,
            unload: None,
        }
    }

    /// Build, initialize, and arrange for cleanup on unload.
    pub fn start(
        kind: PageKind,
        host: Rc<dyn Host>,
        dom: Rc<D>,
        config: Rc<SiteConfig>,
    ) -> Rc<RefCell<Self>> {
        let runtime = Rc::new(RefCell::new(Self::new(kind, host.clone(), dom, config)));
        runtime.borrow_mut().init();
        let weak: Weak<RefCell<Self>> = Rc::downgrade(&runtime);
        let unload = host.listen(
            EventKind::Unload,
            Rc::new(move |_| {
                if let Some(runtime) = weak.upgrade() {
                    runtime.borrow_mut().cleanup();
                }
            }),
        );
        runtime.borrow_mut().unload = Some(unload);
        runtime
    }

    /// (Re)initialize the page. Anything from a previous init is cleared
    /// first, so registrations never double up.
    pub fn init(&mut self) {
        if self.initialized {
            self.cleanup();
        }
        self.script.init(&self.ctx);
        self.ctx.triggers.refresh();
        self.initialized = true;
        self.inits += 1;
        info!("{} page initialized", self.kind);
    }

    pub fn cleanup(&mut self) {
        if !self.initialized {
            return;
        }
        self.script.teardown();
        self.ctx.clear();
        self.initialized = false;
        debug!("{} page cleaned up", self.kind);
    }

    pub fn kind(&self) -> PageKind {
        self.kind
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn init_count(&self) -> usize {
        self.inits
    }

    pub fn context(&self) -> &PageContext<D> {
        &self.ctx
    }
}

impl<D: Dom> Drop for PageRuntime<D> {
    fn drop(&mut self) {
        if self.initialized {
            self.script.teardown();
        }
    }
}
