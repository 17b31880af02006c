//! Default repository layouts per package type

use crate::wire::PackageType;

/// Name of the layout Artifactory assigns a package type by default
pub fn default_layout(package_type: PackageType) -> &'static str {
    match package_type {
        PackageType::Bower => "bower-default",
        PackageType::Cargo => "cargo-default",
        PackageType::Composer => "composer-default",
        PackageType::Conan => "conan-default",
        PackageType::Go => "go-default",
        PackageType::Gradle | PackageType::Maven => "maven-2-default",
        PackageType::Ivy => "ivy-default",
        PackageType::Npm => "npm-default",
        PackageType::Nuget => "nuget-default",
        PackageType::Puppet => "puppet-default",
        PackageType::Sbt => "sbt-default",
        PackageType::Swift => "swift-default",
        PackageType::TerraformModule => "terraform-module-default",
        PackageType::TerraformProvider => "terraform-provider-default",
        _ => "simple-default",
    }
}
