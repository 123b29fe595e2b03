/*
 * inheritor/api - defines the Inheritor CRD shared by the controller and
 * any tooling that needs to read or write it
 */

pub mod inheritor;
pub use inheritor::Inheritor;
pub use inheritor::InheritorSpec;
pub use inheritor::InheritorStatus;
pub use inheritor::NamespaceSelector;
pub use inheritor::NamespaceStatus;
pub use inheritor::Selector;
